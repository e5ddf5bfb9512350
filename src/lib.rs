/*
 Copyright (c) 2025 bit2byte contributors

 This file is part of bit2byte

 bit2byte is free software: you can redistribute it and/or modify it
 under the terms of the GNU General Public License as published by the
 Free Software Foundation, either version 3 of the License, or
 (at your option) any later version.

 bit2byte is distributed in the hope that it will be useful, but
 WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 GNU General Public License for more details.
 You should have received a copy of the GNU General Public License
 along with bit2byte. If not, see <https://www.gnu.org/licenses/>.
*/

//! Pack and unpack 1, 2 and 4 bit telescope samples into/from 8-bit
//! streams, with scalar, lookup-table and data-parallel paths, plus a
//! requantizer taking signed 8-bit complex voltages down to packed
//! 2-bit codes.

use core::fmt;
use std::process::{ExitCode, Termination};

use log::error;

pub mod bit_layout;
pub mod codec;
pub mod color_logger;
pub mod lookup;
pub mod model;
mod parallel;
pub mod requant;

pub use bit_layout::{BitLayout, Bits};
pub use codec::{pack, pack_into, unpack, unpack_into};
pub use color_logger::ColorLogger;
pub use lookup::unpack_lookup;
pub use model::{BitOrder, CodecError, CodecResult};
pub use requant::requant_ci8_cu2;

#[derive(Debug)]
pub enum MyError {
    Message(String),
}

impl std::fmt::Display for MyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MyError::Message(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for MyError {}

pub type MyResult<T> = Result<T, MyError>;

pub struct TermResult(pub MyResult<()>);

impl Termination for TermResult {
    fn report(self) -> ExitCode {
        match self.0 {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                error!("{}", err);
                ExitCode::FAILURE
            }
        }
    }
}

// Convert boxed dynamic errors into MyError
impl From<Box<dyn std::error::Error>> for MyError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        MyError::Message(err.to_string())
    }
}
