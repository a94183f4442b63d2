use std::sync::atomic::Ordering;

use cucumber::given;

use crate::cucumber::{appeal_world::AppealSystem, AppealWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut AppealWorld) {
    let system = AppealSystem::new().await;
    world.system = Some(system);
}

#[given("the renderer is down")]
async fn renderer_down(world: &mut AppealWorld) {
    world.system().renderer.down.store(true, Ordering::SeqCst);
}

#[given(expr = "the daily precheck limit is {int}")]
async fn daily_limit(world: &mut AppealWorld, limit: i64) {
    world.system.as_mut().expect("System not initialised").config.free_daily_limit = limit;
}
