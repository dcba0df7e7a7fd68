//! Requestor workflow.
//!
//! `discover -> connect -> subscribe -> ready barrier -> drain -> signal done`.
//! The blocks subscription is opened before the ready barrier, so every
//! identifier the provider publishes afterwards is observed. Fetches are
//! sequential and each is timed on its own; the drain as a whole is timed from
//! the ready barrier to the last fetch.

use std::time::Duration;
use std::time::Instant;

use snafu::OptionExt;
use snafu::ResultExt;
use swapbench_exchange::ContentId;
use swapbench_exchange::Connection;
use swapbench_exchange::Exchange;
use swapbench_exchange::Transport;
use swapbench_sync::Subscription;

use crate::context::InstanceContext;
use crate::error::ConnectSnafu;
use crate::error::CoordinationSnafu;
use crate::error::NotPublishedSnafu;
use crate::error::PlanError;
use crate::error::ProviderNotAdvertisedSnafu;
use crate::error::Result;
use crate::params::FetchPolicy;
use crate::phases::BLOCKS_TOPIC;
use crate::phases::PROVIDER_TOPIC;
use crate::phases::Phase;
use crate::phases::await_ready;
use crate::phases::signal_done;
use crate::pure::shortfall;
use crate::report::FetchOutcome;
use crate::report::FetchRecord;
use crate::report::RequestorReport;

/// Run the requestor side of a speed test.
pub async fn run_requestor<N>(ctx: &InstanceContext, node: &N) -> Result<RequestorReport>
where
    N: Exchange + Transport,
{
    let InstanceContext {
        instance,
        params,
        sync,
        env,
    } = ctx;

    env.record_phase(Phase::Discover);
    let mut providers = sync.subscribe(&PROVIDER_TOPIC).await.context(CoordinationSnafu {
        phase: Phase::Discover,
    })?;
    let provider = providers
        .next()
        .await
        .context(CoordinationSnafu {
            phase: Phase::Discover,
        })?
        .context(ProviderNotAdvertisedSnafu)?;
    providers.close();
    env.record_message(format!("will contact the provider at {provider}"));

    env.record_phase(Phase::Connect);
    let connection = node.connect(&provider).await.context(ConnectSnafu {
        provider: provider.to_string(),
    })?;

    let mut blocks = sync.subscribe(&BLOCKS_TOPIC).await.context(CoordinationSnafu {
        phase: Phase::Connect,
    })?;

    await_ready(sync, env, instance).await?;

    env.record_phase(Phase::Drain);
    let expected = params.block_count();
    let begin = Instant::now();
    let mut records = Vec::new();
    let mut missing = 0;

    for index in 0..expected {
        let Some(id) = next_identifier(&mut blocks, params.announce_timeout).await? else {
            if params.fetch_policy == FetchPolicy::Strict {
                return NotPublishedSnafu {
                    expected,
                    received: index,
                }
                .fail();
            }
            missing = shortfall(expected, index);
            env.record_message(format!("provider never published {missing} of {expected} blocks"));
            break;
        };

        env.record_message(format!("downloading block {id}"));
        let (record, error) = fetch(node, &connection, index, id, params.fetch_timeout).await;
        env.record_fetch(&record);
        if let Some(error) = error
            && params.fetch_policy == FetchPolicy::Strict
        {
            return Err(error);
        }
        records.push(record);
    }

    let total = begin.elapsed();
    blocks.close();
    env.record_message(format!("drained {} blocks in {:?}", records.len(), total));

    let done_signalled_at = Instant::now();
    signal_done(sync, env).await?;
    env.record_phase(Phase::Finished);

    Ok(RequestorReport {
        provider,
        records,
        total,
        missing,
        done_signalled_at,
    })
}

/// Next identifier from the blocks topic, or `None` if the topic closed or
/// the announce timeout expired first.
async fn next_identifier(blocks: &mut Subscription<ContentId>, wait: Option<Duration>) -> Result<Option<ContentId>> {
    let next = match wait {
        Some(wait) => match tokio::time::timeout(wait, blocks.next()).await {
            Ok(next) => next,
            Err(_) => return Ok(None),
        },
        None => blocks.next().await,
    };
    next.context(CoordinationSnafu { phase: Phase::Drain })
}

/// Fetch one block and classify the attempt.
///
/// The record is always produced. The error is set for every non-success
/// outcome and describes it for strict runs.
async fn fetch<N>(
    node: &N,
    connection: &Connection,
    index: u64,
    id: ContentId,
    fetch_timeout: Option<Duration>,
) -> (FetchRecord, Option<PlanError>)
where
    N: Exchange,
{
    let started = Instant::now();
    let attempt = match fetch_timeout {
        Some(after) => tokio::time::timeout(after, node.get(&id, connection)).await.map_err(|_| after),
        None => Ok(node.get(&id, connection).await),
    };
    let latency = started.elapsed();

    let (outcome, error) = match attempt {
        Ok(Ok(block)) if block.id() == &id => (
            FetchOutcome::Fetched {
                latency,
                size_bytes: block.len() as u64,
            },
            None,
        ),
        Ok(Ok(block)) => {
            let actual = *block.id();
            (FetchOutcome::Corrupt { latency, actual }, Some(PlanError::CorruptBlock { index, id, actual }))
        }
        Ok(Err(source)) => (
            FetchOutcome::Failed {
                latency,
                reason: source.to_string(),
            },
            Some(PlanError::Fetch { index, id, source }),
        ),
        Err(after) => (FetchOutcome::TimedOut { after }, Some(PlanError::FetchTimeout { index, id, after })),
    };

    (FetchRecord { index, id, outcome }, error)
}
