//! Demo/trace driver for the random-dots decision task.
//!
//! Runs the environment for a fixed number of steps under a simple policy and
//! prints the trace, one row per step, followed by an outcome summary.
//!
//! Examples:
//!   rdm --steps 100 --timing 100,200,200,200,100 --action 1
//!   rdm --policy integrator --steps 2000 --format jsonl
//!   rdm --config task.json --describe

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use rdm_env::observer::{EnvAdapter, StepRecord, TraceRecorder};
use rdm_env::prelude::*;
use rdm_env::prng::Prng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyKind {
    /// Always emit `--action`.
    Fixed,
    /// Uniform over `0..=num_choices`.
    Random,
    /// Hold during the stimulus, sum the evidence, then pick its argmax.
    Integrator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Jsonl,
}

#[derive(Parser)]
#[command(name = "rdm")]
#[command(version)]
#[command(about = "Run the N-alternative random-dots task and print the episode trace")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of environment steps to run.
    #[arg(long, default_value_t = 100)]
    steps: usize,

    /// JSON task configuration; command-line options override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Time step (ms).
    #[arg(long)]
    dt: Option<f64>,

    /// fixation,stimulus_min,stimulus_mean,stimulus_max,decision (ms)
    #[arg(long, value_delimiter = ',')]
    timing: Option<Vec<f64>>,

    /// Number of choices.
    #[arg(long)]
    choices: Option<usize>,

    /// Evidence-strength multiplier.
    #[arg(long)]
    stim_ev: Option<f32>,

    /// End the trial on an abort instead of only penalizing it.
    #[arg(long)]
    abort_ends_trial: bool,

    /// Experiment length in trials.
    #[arg(long)]
    num_trials: Option<u64>,

    #[arg(long, value_enum, default_value_t = PolicyKind::Fixed)]
    policy: PolicyKind,

    /// Action used by the fixed policy.
    #[arg(long, default_value_t = 1)]
    action: usize,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Print the task description before running.
    #[arg(long)]
    describe: bool,
}

impl Cli {
    fn task_config(&self) -> Result<TaskConfig, Box<dyn std::error::Error>> {
        let mut cfg = match &self.config {
            Some(path) => TaskConfig::from_json_str(&std::fs::read_to_string(path)?)?,
            None => TaskConfig::default(),
        };
        if let Some(seed) = self.seed {
            cfg = cfg.with_seed(seed);
        }
        if let Some(dt) = self.dt {
            cfg = cfg.with_dt(dt);
        }
        if let Some(t) = &self.timing {
            let [f, smin, smean, smax, d] = t.as_slice() else {
                return Err(format!("--timing expects 5 values, got {}", t.len()).into());
            };
            cfg = cfg.with_timing((*f, *smin, *smean, *smax, *d));
        }
        if let Some(n) = self.choices {
            cfg = cfg.with_num_choices(n);
        }
        if let Some(ev) = self.stim_ev {
            cfg = cfg.with_stim_ev(ev);
        }
        if self.abort_ends_trial {
            cfg = cfg.with_abort_ends_trial(true);
        }
        if let Some(n) = self.num_trials {
            cfg = cfg.with_num_trials(n);
        }
        Ok(cfg)
    }
}

/// Chooses the next action from the last observation.
struct Agent {
    kind: PolicyKind,
    fixed: usize,
    num_choices: usize,
    rng: Prng,
    evidence: Vec<f32>,
}

impl Agent {
    fn new(kind: PolicyKind, fixed: usize, num_choices: usize, seed: u64) -> Self {
        Self {
            kind,
            fixed,
            num_choices,
            rng: Prng::new(seed),
            evidence: vec![0.0; num_choices + 1],
        }
    }

    fn act(&mut self, last_obs: Option<&[f32]>) -> usize {
        match self.kind {
            PolicyKind::Fixed => self.fixed,
            PolicyKind::Random => self.rng.gen_range_usize(0, self.num_choices + 1),
            PolicyKind::Integrator => {
                let Some(obs) = last_obs else {
                    return 0;
                };
                if obs[0] > 0.5 {
                    for (acc, x) in self.evidence.iter_mut().zip(obs).skip(1) {
                        *acc += x;
                    }
                    return 0;
                }
                self.evidence
                    .iter()
                    .enumerate()
                    .skip(1)
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            }
        }
    }

    fn end_trial(&mut self) {
        self.evidence.iter_mut().for_each(|x| *x = 0.0);
    }
}

fn out_line(args: std::fmt::Arguments<'_>) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_fmt(args)?;
    out.write_all(b"\n")
}

fn render_row(r: &StepRecord) -> String {
    let obs: Vec<String> = r.observation.iter().map(|x| format!("{x:+.2}")).collect();
    format!(
        "{:6} {:6} {:<9} {:6} {:8} {:+7.2} {:<5} {:<8} [{}]",
        r.index,
        r.trial,
        r.phase.as_str(),
        r.action,
        r.expected,
        r.reward,
        r.new_trial,
        r.outcome.as_str(),
        obs.join(" ")
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let cfg = cli.task_config()?;
    if cli.describe {
        print!("{cfg}");
    }
    let num_choices = cfg.num_choices;
    let agent_seed = cfg.seed.unwrap_or(Prng::DEFAULT_SEED).wrapping_add(1);
    let mut env = RdmEnv::new(cfg)?;
    let mut agent = Agent::new(cli.policy, cli.action, num_choices, agent_seed);
    let mut trace = TraceRecorder::new();

    info!(steps = cli.steps, policy = ?cli.policy, "running");

    if cli.format == Format::Table
        && out_line(format_args!(
            "{:>6} {:>6} {:<9} {:>6} {:>8} {:>7} {:<5} {:<8} observation",
            "step", "trial", "phase", "action", "expected", "reward", "new", "outcome"
        ))
        .is_err()
    {
        return Ok(());
    }

    let mut last_obs: Option<Vec<f32>> = None;
    for _ in 0..cli.steps {
        let action = agent.act(last_obs.as_deref());
        let step = env.advance(action)?;
        let row = trace.record(action, &step);

        let written = match cli.format {
            Format::Table => out_line(format_args!("{}", render_row(row))),
            Format::Jsonl => out_line(format_args!("{}", serde_json::to_string(row)?)),
        };
        if written.is_err() {
            return Ok(());
        }

        if step.info.new_trial {
            agent.end_trial();
            last_obs = None;
        } else {
            last_obs = Some(step.observation);
        }
        if step.done {
            info!(trials = env.trial_counter(), "experiment finished; resetting");
            env.reset()?;
        }
    }

    let snapshot = EnvAdapter::new(&env).snapshot();
    let tally = trace.tally();
    match cli.format {
        Format::Table => {
            let _ = out_line(format_args!("done:"));
            let _ = out_line(format_args!(
                "  steps={} trials_ended={} trial_counter={}",
                trace.len(),
                tally.trials,
                snapshot.trial_counter
            ));
            let _ = out_line(format_args!(
                "  correct={} failed={} aborted={} missed={}",
                tally.correct, tally.failed, tally.aborted, tally.missed
            ));
            let _ = out_line(format_args!(
                "  accuracy={:.3} response_rate={:.3} total_reward={:.2}",
                tally.accuracy(),
                tally.response_rate(),
                trace.total_reward()
            ));
        }
        Format::Jsonl => {
            let summary = serde_json::json!({
                "summary": tally,
                "accuracy": tally.accuracy(),
                "total_reward": trace.total_reward(),
                "env": snapshot,
            });
            let _ = out_line(format_args!("{summary}"));
        }
    }
    Ok(())
}
