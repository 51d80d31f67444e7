//! Streaming emitter — orchestrates the pipeline.
//!
//! Walker → filter → analyzer → priority resolver → budget allocator →
//! truncator → framing → sink. The emitter is a lazy chunk producer:
//! [`PackStream`] yields one framed record at a time and the consumer
//! cancels by dropping it. No partial record is ever written: each
//! file's bytes are assembled in full before they are yielded.
//!
//! Batch mode buffers candidate metadata (never content) until all
//! candidates are known, then emits in the caller's sort order. In
//! streaming mode files are committed in traversal order through the
//! allocator's bounded window, so the first output bytes appear long
//! before the last file is read.

pub mod framing;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::analyze::analyzer_for;
use crate::budget::{self, Allocation, BudgetReport, Candidate, StreamAllocator, Strategy};
use crate::config::{self, ConfigFile, SortKey, SortOrder};
use crate::diag::Diagnostics;
use crate::glob::PatternSet;
use crate::lens::{self, Lens};
use crate::priority::{PriorityResolver, PriorityStore, store::STORE_FILE_NAME};
use crate::tokens::estimate_tokens;
use crate::truncate::{TruncateMode, TruncationOutcome, truncate};
use crate::walk::{FileDescriptor, WalkEvent, Walker, filter};

pub use framing::{EmissionRecord, RecordCheck, content_digest, parse_records, verify};

/// Name of the synthetic meta file, emitted first when enabled.
pub const META_FILE_NAME: &str = ".vantage_meta";

/// Exclusions applied to every run: version-control internals and
/// vantage's own control files are never part of a repository's
/// readable surface.
const DEFAULT_IGNORE: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    config::CONFIG_FILE_NAME,
    STORE_FILE_NAME,
];

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Caller-facing options for one invocation. Unset fields resolve
/// through the lens and configuration layers.
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Active lens name; `None` uses the neutral default lens.
    pub lens: Option<String>,
    /// Include globs; non-empty replaces the lens/config include-set.
    pub include: Vec<String>,
    /// Exclude globs, added to the lens/config exclude-set.
    pub exclude: Vec<String>,
    /// Token budget; `None` disables budgeting.
    pub budget: Option<usize>,
    pub strategy: Strategy,
    /// Truncation-mode override.
    pub truncate_mode: Option<TruncateMode>,
    /// Line-limit override for smart/simple truncation.
    pub truncate_lines: Option<usize>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
    /// Files below this priority are dropped outright.
    pub priority_floor: u8,
    /// Streaming mode: traversal order, bounded-window allocation.
    pub streaming: bool,
    /// Emit the synthetic meta file as the first record.
    pub emit_meta: bool,
    pub max_file_size: u64,
    /// Pre-loaded priority store; when `None` the store file at the
    /// root is tried.
    pub store: Option<PriorityStore>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            lens: None,
            include: Vec::new(),
            exclude: Vec::new(),
            budget: None,
            strategy: Strategy::default(),
            truncate_mode: None,
            truncate_lines: None,
            sort_by: None,
            sort_order: None,
            priority_floor: 0,
            streaming: false,
            emit_meta: false,
            max_file_size: filter::DEFAULT_MAX_FILE_SIZE,
            store: None,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default)]
pub struct PackReport {
    pub emitted: usize,
    pub dropped: usize,
    pub budget: BudgetReport,
}

// ---------------------------------------------------------------------------
// Effective parameters
// ---------------------------------------------------------------------------

/// Everything the pipeline needs after the precedence chain (caller >
/// lens > config > built-ins) has been applied.
struct Effective {
    lens: Lens,
    patterns: Arc<PatternSet>,
    resolver: PriorityResolver,
    mode: TruncateMode,
    limit: usize,
    sort_by: SortKey,
    sort_order: SortOrder,
    priority_floor: u8,
}

impl Effective {
    fn resolve(
        root: &Path,
        options: &PackOptions,
        config: &ConfigFile,
        diag: &mut Diagnostics<'_>,
    ) -> Result<Self> {
        let lens = match &options.lens {
            Some(name) => lens::resolve(name, config)?,
            None => Lens::default(),
        };

        let include = if !options.include.is_empty() {
            options.include.clone()
        } else if !lens.include.is_empty() {
            lens.include.clone()
        } else {
            config.include_patterns.clone()
        };

        let mut exclude: Vec<String> =
            DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect();
        exclude.extend(config.ignore_patterns.iter().cloned());
        exclude.extend(lens.exclude.iter().cloned());
        exclude.extend(options.exclude.iter().cloned());

        let patterns = Arc::new(PatternSet::new(&include, &exclude)?);

        let store = match options.store.clone() {
            Some(store) => Some(store),
            None => load_store(root, diag),
        };
        let resolver = PriorityResolver::new(&lens.groups, store)?;

        Ok(Self {
            mode: options.truncate_mode.unwrap_or(lens.truncate_mode),
            limit: options.truncate_lines.unwrap_or(lens.truncate_lines),
            sort_by: options.sort_by.unwrap_or(lens.sort_by),
            sort_order: options.sort_order.unwrap_or(lens.sort_order),
            priority_floor: options.priority_floor,
            patterns,
            resolver,
            lens,
        })
    }
}

/// Try the store file at the root. Failures degrade to static
/// priorities, logged once.
fn load_store(root: &Path, diag: &mut Diagnostics<'_>) -> Option<PriorityStore> {
    let path = root.join(STORE_FILE_NAME);
    if !path.exists() {
        return None;
    }
    match PriorityStore::load(&path) {
        Ok(store) => Some(store),
        Err(err) => {
            diag.warn(&format!("priority store unreadable, ignoring: {err}"));
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate evaluation
// ---------------------------------------------------------------------------

/// Metadata kept per candidate between planning and emission. Content
/// is re-read at emission time so batch mode never buffers file bodies.
#[derive(Debug, Clone)]
struct Planned {
    desc: FileDescriptor,
    /// Per-file truncation mode after any group override.
    mode: TruncateMode,
    limit: usize,
    priority: u8,
}

/// Evaluate one walked file into an allocator candidate.
///
/// Returns `None` when the file is dropped here (read failure,
/// priority floor); the reason has already gone to the diagnostic
/// channel.
fn evaluate(
    desc: FileDescriptor,
    effective: &Effective,
    diag: &mut Diagnostics<'_>,
) -> Option<(Planned, Candidate)> {
    let resolved = effective.resolver.resolve(&desc.rel_path);
    if resolved.value < effective.priority_floor && !resolved.always_include {
        diag.info(&format!(
            "skipping {}: priority {} below floor {}",
            desc.rel_path, resolved.value, effective.priority_floor
        ));
        return None;
    }

    let content = match filter::read_decoded(&desc.abs_path) {
        Ok(content) => content,
        Err(err) => {
            diag.warn(&format!("skipping {}: {err}", desc.rel_path));
            return None;
        }
    };

    let mode = resolved.mode_override.unwrap_or(effective.mode);
    let analyzer = analyzer_for(&desc.rel_path);
    let planned_outcome = truncate(&content, analyzer, mode, effective.limit);
    let structure_outcome = truncate(&content, analyzer, TruncateMode::Structure, effective.limit);

    let candidate = Candidate {
        rel_path: desc.rel_path.clone(),
        priority: resolved.value,
        always_include: resolved.always_include,
        mode,
        full_cost: estimate_tokens(&planned_outcome.content),
        structure_cost: estimate_tokens(&structure_outcome.content),
    };
    let planned = Planned {
        desc,
        mode,
        limit: effective.limit,
        priority: resolved.value,
    };
    Some((planned, candidate))
}

/// Build the final emission record for a planned file, re-reading its
/// content. The digest always covers the original decoded content.
fn build_record(planned: &Planned, allocation: Allocation) -> Result<EmissionRecord> {
    let content = filter::read_decoded(&planned.desc.abs_path)?;
    Ok(record_from_content(
        &planned.desc.rel_path,
        &content,
        final_mode(planned.mode, allocation),
        planned.limit,
    ))
}

fn final_mode(planned: TruncateMode, allocation: Allocation) -> TruncateMode {
    match allocation {
        Allocation::Structure { .. } => TruncateMode::Structure,
        _ => planned,
    }
}

fn record_from_content(
    rel_path: &str,
    content: &str,
    mode: TruncateMode,
    limit: usize,
) -> EmissionRecord {
    let digest = content_digest(content);
    let outcome: TruncationOutcome = truncate(content, analyzer_for(rel_path), mode, limit);
    EmissionRecord {
        rel_path: rel_path.to_string(),
        content: outcome.content,
        digest,
        original_lines: outcome.original_lines,
        final_lines: outcome.final_lines,
        truncated: outcome.truncated,
    }
}

/// Render one record to its exact output bytes.
fn render(record: &EmissionRecord) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    framing::write_record(&mut buf, record)?;
    String::from_utf8(buf).context("framed record is not UTF-8")
}

// ---------------------------------------------------------------------------
// Meta file
// ---------------------------------------------------------------------------

/// Synthetic first record describing the active lens. The timestamp is
/// derived from the newest mtime among emitted files, never the wall
/// clock, so identical inputs frame identically.
fn meta_record(lens: &Lens, newest_mtime: Option<SystemTime>) -> EmissionRecord {
    let mut content = format!("lens: {}\ndescription: {}\n", lens.name, lens.description);
    if let Some(mtime) = newest_mtime {
        let stamp: DateTime<Utc> = mtime.into();
        content.push_str(&format!(
            "generated: {}\n",
            stamp.format("%Y-%m-%dT%H:%M:%SZ")
        ));
    }
    let lines = content.split_inclusive('\n').count();
    EmissionRecord {
        rel_path: META_FILE_NAME.to_string(),
        digest: content_digest(&content),
        content,
        original_lines: lines,
        final_lines: lines,
        truncated: false,
    }
}

// ---------------------------------------------------------------------------
// PackStream
// ---------------------------------------------------------------------------

/// Lazy sequence of framed-record chunks. Dropping the stream cancels
/// the run with nothing half-written.
pub struct PackStream<'d> {
    diag: Diagnostics<'d>,
    state: State,
    report: Option<PackReport>,
}

enum State {
    /// Batch: the full emission plan is known; records are built one
    /// per pull.
    Batch {
        plan: Vec<(Planned, Allocation)>,
        budget_report: BudgetReport,
        next: usize,
        meta: Option<EmissionRecord>,
    },
    Streaming {
        /// `None` once the traversal is exhausted.
        walker: Option<Walker>,
        effective: Effective,
        allocator: Option<StreamAllocator>,
        /// Committed but not yet yielded.
        ready: std::collections::VecDeque<(Planned, Allocation)>,
        /// Planned entries awaiting their allocator commit.
        pending: Vec<Planned>,
        meta: Option<Lens>,
        emitted: usize,
        dropped: usize,
        budget_report: Option<BudgetReport>,
    },
    Done,
}

impl<'d> PackStream<'d> {
    /// Construct the stream. Configuration errors (bad config file,
    /// unknown lens, invalid glob) fail here, before any output.
    pub fn new(root: &Path, options: &PackOptions, mut diag: Diagnostics<'d>) -> Result<Self> {
        let config = config::load(root, &mut diag)?;
        let effective = Effective::resolve(root, options, &config, &mut diag)?;
        diag.info(&format!(
            "lens: {} — {}",
            effective.lens.name, effective.lens.description
        ));

        if options.streaming {
            diag.info("streaming: sort ordering suppressed, output follows traversal order");
            let walker = Walker::new(root, Arc::clone(&effective.patterns), options.max_file_size);
            let meta = options.emit_meta.then(|| effective.lens.clone());
            return Ok(Self {
                diag,
                state: State::Streaming {
                    walker: Some(walker),
                    allocator: Some(StreamAllocator::new(options.budget, options.strategy)),
                    effective,
                    ready: std::collections::VecDeque::new(),
                    pending: Vec::new(),
                    meta,
                    emitted: 0,
                    dropped: 0,
                    budget_report: None,
                },
                report: None,
            });
        }

        // Batch: walk everything, evaluate, sort, allocate up front.
        let walker = Walker::new(root, Arc::clone(&effective.patterns), options.max_file_size);
        let mut planned = Vec::new();
        let mut candidates = Vec::new();
        for event in walker {
            match event {
                WalkEvent::File(desc) => {
                    if let Some((p, c)) = evaluate(desc, &effective, &mut diag) {
                        planned.push(p);
                        candidates.push(c);
                    }
                }
                WalkEvent::Skipped { path, reason } => report_skip(&mut diag, &path, &reason),
            }
        }

        // Sort key, then priority, then path.
        let mut order: Vec<usize> = (0..planned.len()).collect();
        order.sort_by(|&a, &b| {
            let pa = &planned[a];
            let pb = &planned[b];
            let primary = match effective.sort_by {
                SortKey::Name => pa.desc.rel_path.cmp(&pb.desc.rel_path),
                SortKey::Mtime => pa.desc.mtime.cmp(&pb.desc.mtime),
                SortKey::Ctime => pa.desc.ctime.cmp(&pb.desc.ctime),
            };
            let primary = match effective.sort_order {
                SortOrder::Asc => primary,
                SortOrder::Desc => primary.reverse(),
            };
            primary
                .then(pb.priority.cmp(&pa.priority))
                .then(pa.desc.rel_path.cmp(&pb.desc.rel_path))
        });
        let planned: Vec<Planned> = order.iter().map(|&i| planned[i].clone()).collect();
        let candidates: Vec<Candidate> = order.iter().map(|&i| candidates[i].clone()).collect();

        let (allocations, budget_report) =
            budget::allocate(&candidates, options.budget, options.strategy);

        let meta = options.emit_meta.then(|| {
            let newest = planned
                .iter()
                .zip(&allocations)
                .filter(|(_, a)| a.emitted())
                .map(|(p, _)| p.desc.mtime)
                .max();
            meta_record(&effective.lens, newest)
        });

        let plan: Vec<(Planned, Allocation)> =
            planned.into_iter().zip(allocations).collect();

        Ok(Self {
            diag,
            state: State::Batch {
                plan,
                budget_report,
                next: 0,
                meta,
            },
            report: None,
        })
    }

    /// The run summary; available once the stream is exhausted.
    pub fn report(&self) -> Option<&PackReport> {
        self.report.as_ref()
    }

    fn finish(&mut self, emitted: usize, dropped: usize, budget: BudgetReport) {
        for line in budget.lines() {
            self.diag.info(&line);
        }
        self.report = Some(PackReport {
            emitted,
            dropped,
            budget,
        });
        self.state = State::Done;
    }
}

fn report_skip(diag: &mut Diagnostics<'_>, path: &str, reason: &str) {
    if path.is_empty() {
        diag.warn(&format!("walk error: {reason}"));
    } else {
        diag.warn(&format!("skipping {path}: {reason}"));
    }
}

impl Iterator for PackStream<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                State::Done => return None,

                State::Batch {
                    plan,
                    budget_report,
                    next,
                    meta,
                } => {
                    // The meta record leads, but only when at least one
                    // real record follows: an empty repository emits
                    // zero bytes.
                    if meta.is_some() && plan.iter().any(|(_, a)| a.emitted()) {
                        let record = meta.take().expect("meta checked above");
                        return Some(render(&record));
                    }
                    meta.take();

                    while *next < plan.len() {
                        let (planned, allocation) = &plan[*next];
                        *next += 1;
                        if !allocation.emitted() {
                            continue;
                        }
                        match build_record(planned, *allocation) {
                            Ok(record) => return Some(render(&record)),
                            Err(err) => {
                                self.diag.warn(&format!(
                                    "skipping {}: {err}",
                                    planned.desc.rel_path
                                ));
                            }
                        }
                    }

                    let emitted = plan.iter().filter(|(_, a)| a.emitted()).count();
                    let dropped = plan.len() - emitted;
                    let budget = std::mem::take(budget_report);
                    self.finish(emitted, dropped, budget);
                }

                State::Streaming {
                    walker,
                    effective,
                    allocator,
                    ready,
                    pending,
                    meta,
                    emitted,
                    dropped,
                    budget_report,
                } => {
                    if let Some((planned, allocation)) = ready.pop_front() {
                        if !allocation.emitted() {
                            *dropped += 1;
                            continue;
                        }
                        // The meta record precedes the first emission.
                        if let Some(lens) = meta.take() {
                            ready.push_front((planned, allocation));
                            let record = meta_record(&lens, None);
                            return Some(render(&record));
                        }
                        match build_record(&planned, allocation) {
                            Ok(record) => {
                                *emitted += 1;
                                return Some(render(&record));
                            }
                            Err(err) => {
                                self.diag
                                    .warn(&format!("skipping {}: {err}", planned.desc.rel_path));
                                *dropped += 1;
                                continue;
                            }
                        }
                    }

                    // Queue empty: refill from the walker, or wind
                    // down once it is exhausted.
                    match walker.as_mut().and_then(Iterator::next) {
                        Some(WalkEvent::File(desc)) => {
                            if let Some((planned, candidate)) =
                                evaluate(desc, effective, &mut self.diag)
                            {
                                pending.push(planned);
                                let committed = allocator
                                    .as_mut()
                                    .expect("allocator live while walking")
                                    .push(candidate);
                                enqueue_committed(committed, pending, ready);
                            }
                        }
                        Some(WalkEvent::Skipped { path, reason }) => {
                            report_skip(&mut self.diag, &path, &reason);
                        }
                        None => {
                            if let Some(allocator) = allocator.take() {
                                let (rest, budget) = allocator.finish();
                                enqueue_committed(rest, pending, ready);
                                *budget_report = Some(budget);
                                walker.take();
                                continue;
                            }
                            let (e, d) = (*emitted, *dropped);
                            let budget = budget_report.take().unwrap_or_default();
                            self.finish(e, d, budget);
                        }
                    }
                }
            }
        }
    }
}

/// Match committed allocator outputs back to their planned entries, in
/// commit order.
fn enqueue_committed(
    committed: Vec<(Candidate, Allocation)>,
    pending: &mut Vec<Planned>,
    ready: &mut std::collections::VecDeque<(Planned, Allocation)>,
) {
    for (candidate, allocation) in committed {
        if let Some(pos) = pending
            .iter()
            .position(|p| p.desc.rel_path == candidate.rel_path)
        {
            let planned = pending.remove(pos);
            ready.push_back((planned, allocation));
        }
    }
}

// ---------------------------------------------------------------------------
// Caller surface
// ---------------------------------------------------------------------------

/// Stream a repository into `sink`, diagnostics into `diag`.
pub fn pack(
    root: &Path,
    options: &PackOptions,
    sink: &mut dyn Write,
    diag: Diagnostics<'_>,
) -> Result<PackReport> {
    let mut stream = pack_iter(root, options, diag)?;
    for chunk in &mut stream {
        let chunk = chunk?;
        sink.write_all(chunk.as_bytes())
            .context("failed to write output")?;
    }
    Ok(stream.report().cloned().unwrap_or_default())
}

/// The lazy form [`pack`] is built on.
pub fn pack_iter<'d>(
    root: &Path,
    options: &PackOptions,
    diag: Diagnostics<'d>,
) -> Result<PackStream<'d>> {
    PackStream::new(root, options, diag)
}

/// Pure variant: no filesystem access. `files` are (relative path,
/// raw bytes) pairs; the result is the framed artifact.
pub fn process(files: &[(String, Vec<u8>)], options: &PackOptions) -> Result<Vec<u8>> {
    let config = ConfigFile::default();
    let lens = match &options.lens {
        Some(name) => lens::resolve(name, &config)?,
        None => Lens::default(),
    };

    let include = if !options.include.is_empty() {
        options.include.clone()
    } else {
        lens.include.clone()
    };
    let mut exclude: Vec<String> = DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect();
    exclude.extend(lens.exclude.iter().cloned());
    exclude.extend(options.exclude.iter().cloned());
    let patterns = PatternSet::new(&include, &exclude)?;
    let resolver = PriorityResolver::new(&lens.groups, options.store.clone())?;

    let mode_default = options.truncate_mode.unwrap_or(lens.truncate_mode);
    let limit = options.truncate_lines.unwrap_or(lens.truncate_lines);

    // Evaluate in input order; sort by name (the only key available
    // without filesystem metadata), then priority, then path.
    struct PureCandidate {
        rel_path: String,
        content: String,
        mode: TruncateMode,
        priority: u8,
    }
    let mut pure = Vec::new();
    let mut candidates = Vec::new();
    for (rel_path, bytes) in files {
        if !patterns.matches(rel_path) {
            continue;
        }
        if bytes.len() as u64 > options.max_file_size {
            continue;
        }
        if filter::probe_bytes(bytes).is_some() {
            continue;
        }
        let content = filter::decode(bytes.clone());
        let resolved = resolver.resolve(rel_path);
        if resolved.value < options.priority_floor && !resolved.always_include {
            continue;
        }
        let mode = resolved.mode_override.unwrap_or(mode_default);
        let analyzer = analyzer_for(rel_path);
        let planned_outcome = truncate(&content, analyzer, mode, limit);
        let structure_outcome = truncate(&content, analyzer, TruncateMode::Structure, limit);
        candidates.push(Candidate {
            rel_path: rel_path.clone(),
            priority: resolved.value,
            always_include: resolved.always_include,
            mode,
            full_cost: estimate_tokens(&planned_outcome.content),
            structure_cost: estimate_tokens(&structure_outcome.content),
        });
        pure.push(PureCandidate {
            rel_path: rel_path.clone(),
            content,
            mode,
            priority: resolved.value,
        });
    }

    let mut order: Vec<usize> = (0..pure.len()).collect();
    order.sort_by(|&a, &b| {
        pure[a]
            .rel_path
            .cmp(&pure[b].rel_path)
            .then(pure[b].priority.cmp(&pure[a].priority))
    });
    let pure: Vec<PureCandidate> = {
        let mut sorted = Vec::with_capacity(pure.len());
        let mut by_index: Vec<Option<PureCandidate>> = pure.into_iter().map(Some).collect();
        for &i in &order {
            sorted.push(by_index[i].take().expect("each index taken once"));
        }
        sorted
    };
    let candidates: Vec<Candidate> = order.iter().map(|&i| candidates[i].clone()).collect();

    let (allocations, _) = budget::allocate(&candidates, options.budget, options.strategy);

    let mut out: Vec<u8> = Vec::new();
    for (candidate, allocation) in pure.iter().zip(&allocations) {
        if !allocation.emitted() {
            continue;
        }
        let record = record_from_content(
            &candidate.rel_path,
            &candidate.content,
            final_mode(candidate.mode, *allocation),
            limit,
        );
        framing::write_record(&mut out, &record)?;
    }
    Ok(out)
}
