//! Test case registry and role dispatch.

use std::fmt;
use std::str::FromStr;

use swapbench_exchange::Exchange;
use swapbench_exchange::RandomPayload;
use swapbench_exchange::Transport;

use crate::context::InstanceContext;
use crate::error::PlanError;
use crate::error::Result;
use crate::error::UnknownTestCaseSnafu;
use crate::phases::await_ready;
use crate::provider::run_provider;
use crate::report::InstanceOutcome;
use crate::report::RendezvousReport;
use crate::requestor::run_requestor;
use crate::role::Role;

/// A named benchmark entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestCase {
    /// One provider serves blocks; every requestor fetches and times them.
    SpeedTest,
    /// Every instance meets at the ready barrier and reports its role.
    Rendezvous,
}

impl TestCase {
    /// Every registered case.
    pub const ALL: [TestCase; 2] = [TestCase::SpeedTest, TestCase::Rendezvous];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SpeedTest => "speed-test",
            Self::Rendezvous => "rendezvous",
        }
    }

    /// Look up a case by its registered name.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|case| case.name() == name)
            .ok_or_else(|| UnknownTestCaseSnafu { name }.build())
    }
}

impl FromStr for TestCase {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run one instance of `case`, dispatching on its role.
pub async fn run_instance<N>(case: TestCase, ctx: &InstanceContext, node: &N) -> Result<InstanceOutcome>
where
    N: Exchange + Transport,
{
    ctx.params.validate()?;
    ctx.env.record_message(format!("running {case}"));

    match case {
        TestCase::SpeedTest => match ctx.instance.role {
            Role::Provider => {
                ctx.env.record_message("running provider");
                let mut payload = RandomPayload::new(ctx.params.seed);
                run_provider(ctx, node, &mut payload).await.map(InstanceOutcome::Provider)
            }
            Role::Requestor => {
                ctx.env.record_message("running requestor");
                run_requestor(ctx, node).await.map(InstanceOutcome::Requestor)
            }
        },
        TestCase::Rendezvous => rendezvous(ctx, node).await.map(InstanceOutcome::Rendezvous),
    }
}

async fn rendezvous<N>(ctx: &InstanceContext, node: &N) -> Result<RendezvousReport>
where
    N: Transport,
{
    for addr in node.listen_addrs() {
        ctx.env.record_message(format!("listening on {addr}"));
    }

    let ready_position = await_ready(&ctx.sync, &ctx.env, &ctx.instance).await?;
    let role = ctx.instance.role;
    ctx.env.record_message(format!("i am a {role}"));
    if role == Role::Provider {
        ctx.env.record_message(format!("would serve {}-byte blocks", ctx.params.size));
    }

    Ok(RendezvousReport { role, ready_position })
}
