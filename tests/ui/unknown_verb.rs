#![allow(unused)]
use mmg_dispatch::prelude::*;

#[mmg_dispatch::controller]
#[derive(Default)]
struct C;

#[mmg_dispatch::controller]
impl C {
    #[mmg_dispatch::action(verbs(GET, FETCH))]
    fn show(&self) -> View {
        View::text("x")
    }
}

fn main() {}
