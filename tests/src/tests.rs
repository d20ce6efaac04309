#![cfg(test)]

mod harness;

mod arith;
mod branch;
mod call;
mod condition_code;
mod faults;
mod io;
mod load_store;
mod progs;
mod trap;
