use mmg_dispatch::prelude::*;

#[mmg_dispatch::controller]
#[derive(Default)]
struct C;

#[mmg_dispatch::controller]
impl C {
    #[mmg_dispatch::action]
    async fn show(&mut self, _ctx: &RequestContext) -> View {
        View::text("ok")
    }
}

fn main() {}
