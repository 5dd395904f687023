// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The coordinator/worker message contract for distributed solving.
//!
//! Messages are fixed 32-byte ASCII frames, NUL-padded, exchanged over a
//! reader/writer pair (stdin/stdout when the worker runs as a subprocess).
//! A worker polls with `check`, reports a finished tier by name (prefixed
//! with `!` on failure), and the coordinator answers with a tier name to
//! solve, `sleep`, or `terminate`. Only the message plumbing and the
//! single-node loops live here; process and cluster management are the
//! caller's business.

use super::{
    manager::{SolveReport, TierGraph},
    worker::{SolveOutcome, TierWorker},
};
use crate::{coding::Encode, context::SolveContext, model::Tier, stats::TierStats};
use rustc_hash::FxHashMap;
use std::io::{Read, Write};

/// Fixed frame size of every message
pub const MESSAGE_SIZE: usize = 32;

const CHECK: &str = "check";
const SLEEP: &str = "sleep";
const TERMINATE: &str = "terminate";

/// What a worker sends to the coordinator
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WorkerMessage {
    /// Polling for work
    Check,

    /// The named tier was solved and flushed
    Solved(String),

    /// The named tier failed
    Failed(String),
}

/// What the coordinator answers
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoordinatorMessage {
    /// Solve the named tier next
    Solve(String),

    /// No work right now; poll again later
    Sleep,

    /// All work is finished; write the statistics blob and exit
    Terminate,
}

fn encode_frame(text: &str) -> crate::Result<[u8; MESSAGE_SIZE]> {
    if text.is_empty() || text.len() >= MESSAGE_SIZE || !text.is_ascii() {
        return Err(crate::Error::Config(
            "message payload must be non-empty ASCII shorter than the frame",
        ));
    }

    let mut frame = [0u8; MESSAGE_SIZE];

    if let Some(slot) = frame.get_mut(..text.len()) {
        slot.copy_from_slice(text.as_bytes());
    }

    Ok(frame)
}

fn decode_frame(frame: &[u8; MESSAGE_SIZE]) -> crate::Result<&str> {
    let end = frame.iter().position(|&b| b == 0).unwrap_or(MESSAGE_SIZE);

    let text = frame
        .get(..end)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .filter(|text| !text.is_empty() && text.is_ascii())
        .ok_or(crate::Error::InvalidHeader("MessageFrame"))?;

    Ok(text)
}

impl WorkerMessage {
    /// Writes the message as one frame.
    pub fn write_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        let frame = match self {
            Self::Check => encode_frame(CHECK)?,
            Self::Solved(name) => {
                if name == CHECK {
                    return Err(crate::Error::Config(
                        "tier name collides with a reserved message word",
                    ));
                }
                encode_frame(name)?
            }
            Self::Failed(name) => encode_frame(&format!("!{name}"))?,
        };

        writer.write_all(&frame)?;
        writer.flush()?;

        Ok(())
    }

    /// Reads one frame.
    pub fn read_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let mut frame = [0u8; MESSAGE_SIZE];
        reader.read_exact(&mut frame)?;

        let text = decode_frame(&frame)?;

        Ok(match text {
            CHECK => Self::Check,
            text => match text.strip_prefix('!') {
                Some(name) => Self::Failed(name.into()),
                None => Self::Solved(text.into()),
            },
        })
    }
}

impl CoordinatorMessage {
    /// Writes the message as one frame.
    pub fn write_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        let frame = match self {
            Self::Solve(name) => {
                if name == SLEEP || name == TERMINATE || name == CHECK {
                    return Err(crate::Error::Config(
                        "tier name collides with a reserved message word",
                    ));
                }
                encode_frame(name)?
            }
            Self::Sleep => encode_frame(SLEEP)?,
            Self::Terminate => encode_frame(TERMINATE)?,
        };

        writer.write_all(&frame)?;
        writer.flush()?;

        Ok(())
    }

    /// Reads one frame.
    pub fn read_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let mut frame = [0u8; MESSAGE_SIZE];
        reader.read_exact(&mut frame)?;

        Ok(match decode_frame(&frame)? {
            SLEEP => Self::Sleep,
            TERMINATE => Self::Terminate,
            name => Self::Solve(name.into()),
        })
    }
}

/// The worker end of the message protocol
///
/// Repeatedly polls for tiers, solves them with [`TierWorker`] and reports
/// the outcome; on `terminate` it writes its cumulative statistics blob into
/// the sidecar tree and returns it.
pub struct RemoteWorker<'a> {
    ctx: &'a SolveContext,
    names: FxHashMap<String, Tier>,
}

impl<'a> RemoteWorker<'a> {
    /// Discovers the tier graph so tier names can be resolved back to tiers.
    pub fn new(ctx: &'a SolveContext) -> crate::Result<Self> {
        let graph = TierGraph::discover(ctx)?;
        let mut names = FxHashMap::default();

        for tier in graph.tiers() {
            names.insert(ctx.tier_file_name(tier)?, tier);
        }

        Ok(Self { ctx, names })
    }

    /// Runs the poll/solve/report loop until the coordinator terminates it.
    pub fn run<R: Read, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> crate::Result<TierStats> {
        let worker = TierWorker::new(self.ctx);
        let mut totals = TierStats::default();
        let mut outbound = WorkerMessage::Check;

        loop {
            outbound.write_into(output)?;

            match CoordinatorMessage::read_from(input)? {
                CoordinatorMessage::Solve(name) => {
                    let Some(&tier) = self.names.get(&name) else {
                        log::error!("coordinator assigned unknown tier {name:?}");
                        outbound = WorkerMessage::Failed(name);
                        continue;
                    };

                    outbound = match worker.solve(tier) {
                        Ok(SolveOutcome::Fresh(stats)) => {
                            totals.absorb(&stats);
                            WorkerMessage::Solved(name)
                        }
                        Ok(SolveOutcome::Skipped) => WorkerMessage::Solved(name),
                        Err(e) => {
                            log::error!("remote solve of tier {tier} ({name}) failed: {e}");
                            WorkerMessage::Failed(name)
                        }
                    };
                }

                CoordinatorMessage::Sleep => {
                    std::thread::sleep(std::time::Duration::from_millis(500));
                    outbound = WorkerMessage::Check;
                }

                CoordinatorMessage::Terminate => {
                    self.write_stats_blob(&totals)?;
                    return Ok(totals);
                }
            }
        }
    }

    fn write_stats_blob(&self, totals: &TierStats) -> crate::Result<()> {
        let folder = self.ctx.db().folder().join("analysis");
        std::fs::create_dir_all(&folder)?;
        std::fs::write(folder.join("worker.stats"), totals.encode_into_vec())?;
        Ok(())
    }
}

/// The coordinator end of the message protocol
///
/// Hands ready tiers out of the tier graph to polling workers and collects
/// their reports; once nothing is ready or in flight, every further poll is
/// answered with `terminate`.
pub struct Coordinator<'a> {
    ctx: &'a SolveContext,
    graph: TierGraph,
    names: FxHashMap<String, Tier>,
    in_flight: usize,
    report: SolveReport,
}

impl<'a> Coordinator<'a> {
    /// Discovers and validates the tier graph.
    pub fn new(ctx: &'a SolveContext) -> crate::Result<Self> {
        let graph = TierGraph::discover(ctx)?;
        let mut names = FxHashMap::default();

        for tier in graph.tiers() {
            names.insert(ctx.tier_file_name(tier)?, tier);
        }

        Ok(Self {
            ctx,
            graph,
            names,
            in_flight: 0,
            report: SolveReport::default(),
        })
    }

    /// Answers one worker message.
    pub fn handle(&mut self, message: &WorkerMessage) -> crate::Result<CoordinatorMessage> {
        match message {
            WorkerMessage::Check => {}

            WorkerMessage::Solved(name) => {
                let tier = self.resolve(name)?;
                self.in_flight -= 1;
                self.report.solved.push(tier);
                self.graph.complete(tier, true);
            }

            WorkerMessage::Failed(name) => {
                let tier = self.resolve(name)?;
                self.in_flight -= 1;
                log::error!("worker reported tier {tier} ({name}) as failed");
                self.report.failed.push(tier);
                self.graph.complete(tier, false);
            }
        }

        if let Some(tier) = self.graph.pop_ready() {
            self.in_flight += 1;
            return Ok(CoordinatorMessage::Solve(self.ctx.tier_file_name(tier)?));
        }

        if self.in_flight > 0 {
            return Ok(CoordinatorMessage::Sleep);
        }

        Ok(CoordinatorMessage::Terminate)
    }

    fn resolve(&self, name: &str) -> crate::Result<Tier> {
        self.names
            .get(name)
            .copied()
            .ok_or(crate::Error::Config("worker reported an unknown tier"))
    }

    /// Drives one worker connection until termination.
    pub fn serve<R: Read, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
    ) -> crate::Result<()> {
        loop {
            let message = WorkerMessage::read_from(input)?;
            let reply = self.handle(&message)?;
            let done = reply == CoordinatorMessage::Terminate;

            reply.write_into(output)?;

            if done {
                return Ok(());
            }
        }
    }

    /// The accumulated report, with blocked tiers filled in.
    #[must_use]
    pub fn into_report(mut self) -> SolveReport {
        self.report.blocked = self.graph.blocked();
        self.report
    }
}
