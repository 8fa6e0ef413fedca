//! Given steps for workspace lifecycle BDD scenarios.

use gigo_workspaces::resource_policy::UserTier;
use rstest_bdd_macros::given;

use super::world::LifecycleWorld;

#[given("a public challenge {post_id:i64} by author {author:i64}")]
fn public_challenge(world: &mut LifecycleWorld, post_id: i64, author: i64) {
    world.stack.challenge(post_id, author, None);
}

#[given("a basic learner {user_id:i64}")]
fn basic_learner(world: &mut LifecycleWorld, user_id: i64) {
    world.caller = Some(world.stack.learner(user_id, UserTier::Basic));
}
