#![allow(unused)]

struct C;

#[mmg_dispatch::controller]
impl Default for C {
    fn default() -> Self {
        C
    }
}

fn main() {}
