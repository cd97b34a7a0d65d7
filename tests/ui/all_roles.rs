use mmg_dispatch::controller::ControllerClass;
use mmg_dispatch::prelude::*;

#[mmg_dispatch::interceptor]
#[derive(Default)]
struct Stamp;

#[mmg_dispatch::interceptor]
impl Stamp {
    #[mmg_dispatch::after_action]
    fn stamp(&self, ctx: &RequestContext) -> Option<View> {
        ctx.result().cloned()
    }
}

#[mmg_dispatch::controller(route = "shop", default, interceptors(Stamp))]
#[derive(Default)]
struct Shop {
    ready: bool,
}

#[mmg_dispatch::controller]
impl Shop {
    #[mmg_dispatch::init]
    async fn init(&mut self) -> anyhow::Result<()> {
        self.ready = true;
        Ok(())
    }

    #[mmg_dispatch::before_action]
    fn before(&self, ctx: &mut RequestContext) -> Option<View> {
        ctx.set_attribute("ready", self.ready);
        None
    }

    #[mmg_dispatch::action(name = "item", verbs(GET, HEAD))]
    fn item(&self, id: u64, r#ref: Option<String>) -> View {
        View::text(format!("{} {:?}", id, r#ref))
    }

    #[mmg_dispatch::verb_action(TRACE)]
    fn trace(&self) {}

    #[mmg_dispatch::default_action]
    fn index(&self) -> Option<View> {
        None
    }

    #[mmg_dispatch::after_action]
    fn after(&self, _ctx: &RequestContext) -> anyhow::Result<Option<View>> {
        Ok(None)
    }

    fn untagged(&self) -> u8 {
        1
    }
}

fn main() {
    let class = ControllerClass::of::<Shop>();
    assert_eq!(class.route, Some("shop"));
    assert!(class.application_default);
    assert_eq!(class.methods.len(), 6);
    assert_eq!(class.interceptors.len(), 1);
    assert_eq!(class.interceptors[0].methods[0].ident, "stamp");
    let item = class.methods.iter().find(|m| m.ident == "item").unwrap();
    assert_eq!(item.params[1].name, "ref");
    assert_eq!(Shop::default().untagged(), 1);
}
