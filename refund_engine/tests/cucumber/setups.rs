use cucumber::given;
use refund_engine::{db_types::NewRefund, RefundStore};

use crate::{
    cucumber::{refund_world::RefundSystem, RefundWorld},
    support::{file_id, oracles::FixedOracle},
};

#[given("a fresh install")]
async fn fresh_database(world: &mut RefundWorld) {
    let system = RefundSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "{int} pending refunds")]
async fn pending_refunds(world: &mut RefundWorld, count: usize) {
    for i in 0..count {
        world.db().create_refund(NewRefund::new(file_id(i))).await.expect("Error creating refund");
    }
}

#[given(expr = "a pending refund with file id {string}")]
async fn pending_refund_with_id(world: &mut RefundWorld, id: String) {
    world.db().create_refund(NewRefund::new(id)).await.expect("Error creating refund");
}

#[given(expr = "the status service always answers {word}")]
async fn oracle_answers(world: &mut RefundWorld, answer: String) {
    let oracle = match answer.as_str() {
        "processed" => FixedOracle::processed(),
        "in_progress" => FixedOracle::in_progress(),
        "error" => FixedOracle::error("File not found in IRS system"),
        "unavailable" => FixedOracle::unavailable(),
        other => panic!("Unknown oracle answer: {other}"),
    };
    world.system_mut().oracle = oracle;
}
