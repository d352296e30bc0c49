// SPDX-License-Identifier: GPL-3.0-or-later

pub mod args;
pub mod codegen;
pub mod config;
pub mod context;
pub mod fortran;
pub mod modes;
pub mod output;
