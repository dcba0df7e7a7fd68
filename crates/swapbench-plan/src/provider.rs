//! Provider workflow.
//!
//! `advertise -> ready barrier -> generate -> done barrier`. The provider
//! publishes its address record once, waits for the fleet, then generates,
//! stores, announces and publishes every block in order. A payload whose
//! identifier was already published is regenerated. It stays in the done
//! barrier until every requestor has drained, so its blocks remain servable.

use std::collections::HashSet;
use std::time::Instant;

use snafu::ResultExt;
use swapbench_exchange::Block;
use swapbench_exchange::ContentId;
use swapbench_exchange::Exchange;
use swapbench_exchange::PayloadSource;
use swapbench_exchange::Transport;
use tracing::debug;
use tracing::trace;

use crate::constants::MAX_PAYLOAD_ATTEMPTS;
use crate::context::InstanceContext;
use crate::error::AnnounceSnafu;
use crate::error::CoordinationSnafu;
use crate::error::DuplicatePayloadSnafu;
use crate::error::PublishSnafu;
use crate::error::Result;
use crate::error::StoreSnafu;
use crate::phases::BLOCKS_TOPIC;
use crate::phases::PROVIDER_TOPIC;
use crate::phases::Phase;
use crate::phases::await_done;
use crate::phases::await_ready;
use crate::report::ProviderReport;

/// Run the provider side of a speed test.
///
/// Any store, announce or coordination failure aborts immediately; no block
/// after the failing index is advertised.
pub async fn run_provider<N>(ctx: &InstanceContext, node: &N, payload: &mut dyn PayloadSource) -> Result<ProviderReport>
where
    N: Exchange + Transport,
{
    let InstanceContext {
        instance,
        params,
        sync,
        env,
    } = ctx;

    env.record_phase(Phase::Advertise);
    let address = node.local_record();
    for addr in &address.addrs {
        env.record_message(format!("listening on {addr}"));
    }
    sync.publish(&PROVIDER_TOPIC, &address).await.context(CoordinationSnafu {
        phase: Phase::Advertise,
    })?;

    await_ready(sync, env, instance).await?;

    env.record_phase(Phase::Generate);
    let block_count = params.block_count();
    let mut published = Vec::new();
    let mut seen = HashSet::new();
    for index in 0..block_count {
        debug!(index, size = params.size, "generating block");
        let block = unique_block(payload, params.size as usize, &mut seen, index)?;
        node.put(&block).await.context(StoreSnafu { index })?;
        node.announce(&block).await.context(AnnounceSnafu { index })?;
        sync.publish(&BLOCKS_TOPIC, block.id()).await.context(PublishSnafu { index })?;
        env.record_published(index, block.id());
        published.push(*block.id());
    }

    await_done(sync, env, instance).await?;
    let done_released_at = Instant::now();
    env.record_phase(Phase::Finished);
    env.record_message(format!("provided {} blocks of {} bytes", published.len(), params.size));

    Ok(ProviderReport {
        address,
        published,
        done_released_at,
    })
}

/// Generate a block whose identifier is not yet in `seen`, and record it.
fn unique_block(
    payload: &mut dyn PayloadSource,
    size: usize,
    seen: &mut HashSet<ContentId>,
    index: u64,
) -> Result<Block> {
    for attempt in 1..=MAX_PAYLOAD_ATTEMPTS {
        let block = Block::new(payload.generate(size));
        if seen.insert(*block.id()) {
            return Ok(block);
        }
        trace!(index, attempt, id = %block.id().short(), "regenerating duplicate payload");
    }
    DuplicatePayloadSnafu {
        index,
        attempts: MAX_PAYLOAD_ATTEMPTS,
    }
    .fail()
}
