use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use reacher_core::{
    dummy::DummyScene,
    record::BufferedRecorder,
    ReachTask, ReacherConfig,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file in YAML, overriding environment variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration as YAML
    Config {
        /// Also write the configuration to this file
        #[arg(long)]
        yaml: Option<PathBuf>,
    },

    /// Print the success threshold schedule
    Curriculum,

    /// Run the task against an in-memory scene with a proportional controller
    Demo {
        /// Number of steps
        #[arg(long, default_value_t = 3000)]
        steps: usize,

        /// Number of environments
        #[arg(long, default_value_t = 64)]
        num_envs: usize,

        /// Fraction of the remaining distance covered per step
        #[arg(long, default_value_t = 0.02)]
        gain: f32,

        /// Steps between two convergence reports
        #[arg(long, default_value_t = 500)]
        report_interval: u64,
    },
}

fn load_config(path: &Option<PathBuf>) -> Result<ReacherConfig> {
    match path {
        Some(path) => ReacherConfig::load(path),
        None => Ok(ReacherConfig::from_env()?),
    }
}

fn print_curriculum(config: &ReacherConfig) {
    let mut from = 0;
    for stage in config.curriculum.stages.iter() {
        println!(
            "steps {:>6} .. {:>6}: threshold {:.3}m",
            from, stage.until_step, stage.threshold
        );
        from = stage.until_step;
    }
    println!(
        "steps {:>6} ..       : threshold {:.3}m",
        from, config.curriculum.final_threshold
    );
}

fn demo(
    config: ReacherConfig,
    steps: usize,
    num_envs: usize,
    gain: f32,
    report_interval: u64,
) -> Result<()> {
    let config = config.num_envs(num_envs).convergence_interval(report_interval);
    let mut scene = DummyScene::new(num_envs, 8);
    let mut task = ReachTask::new(config)?;
    let mut recorder = BufferedRecorder::new();

    let all: Vec<usize> = (0..num_envs).collect();
    task.reset(&mut scene, &all)?;

    let mut n_reached = 0;
    let mut reward_sum = 0f32;
    for _ in 0..steps {
        scene.track_targets(gain);
        let step = task.step(&mut scene)?;
        n_reached += step.reached.len();
        reward_sum += step.record.get_scalar("reward/total")?;
        for &i in step.reached.iter() {
            scene.set_end_effector(i, [0.0; 3]);
        }
        step.write_to(&mut recorder);
    }

    let verdict = recorder
        .iter()
        .filter_map(|r| r.get_string("convergence/verdict").ok())
        .last()
        .unwrap_or_else(|| "no report".to_string());
    info!(
        "{} steps, {} targets reached, mean reward {:.3}, {} records, last verdict: {}",
        steps,
        n_reached,
        reward_sum / steps.max(1) as f32,
        recorder.len(),
        verdict
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    match args.command {
        Command::Config { yaml } => {
            print!("{}", serde_yaml::to_string(&config)?);
            if let Some(path) = yaml {
                config.save(&path)?;
                info!("Saved configuration to {:?}", path);
            }
        }
        Command::Curriculum => print_curriculum(&config),
        Command::Demo {
            steps,
            num_envs,
            gain,
            report_interval,
        } => demo(config, steps, num_envs, gain, report_interval)?,
    }
    Ok(())
}
