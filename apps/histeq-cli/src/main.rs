use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use argh::FromArgs;

use histeq::image::Image;
use histeq::imgproc::comm::{run_world, Communicator};
use histeq::imgproc::draw::{draw_histogram, histogram_ascii};
use histeq::imgproc::equalize::distributed::{coordinator_output, equalize_rank, PostHistogram};
use histeq::imgproc::equalize::{equalize_histogram, EqualizeOutput};
use histeq::imgproc::parallel::ExecutionStrategy;
use histeq::imgproc::stack::{stack_images, StackDirection, DEFAULT_DIVIDER_PERCENT};
use histeq::io::functional as F;
use histeq::io::runtime::{measure_runtime, RuntimeLog, RuntimeRecord};
use histeq::io::IoError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(FromArgs, Debug)]
/// Histogram equalization of gray images.
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Equalize(EqualizeArgs),
    Combine(CombineArgs),
}

#[derive(FromArgs, Debug)]
/// Equalize the histogram of an image and write the before/after outputs.
#[argh(subcommand, name = "equalize")]
struct EqualizeArgs {
    /// path to the input image
    #[argh(option, short = 'i')]
    image_path: PathBuf,

    /// execution strategy: sequential, shared or distributed
    #[argh(option, short = 's', default = "StrategyKind::Sequential")]
    strategy: StrategyKind,

    /// number of workers or ranks, defaults to the available parallelism
    #[argh(option, short = 'n')]
    num_workers: Option<usize>,

    /// directory where the outputs are written
    #[argh(option, short = 'o', default = "PathBuf::from(\"output\")")]
    output_dir: PathBuf,

    /// do not print the ascii histograms
    #[argh(switch, short = 'q')]
    quiet: bool,

    /// append the runtime to this csv file
    #[argh(option)]
    runtime_log: Option<PathBuf>,
}

#[derive(FromArgs, Debug)]
/// Stack the results of the three strategies side by side.
#[argh(subcommand, name = "combine")]
struct CombineArgs {
    /// directory holding the per-strategy outputs
    #[argh(option, short = 'o', default = "PathBuf::from(\"output\")")]
    output_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StrategyKind {
    Sequential,
    Shared,
    Distributed,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" | "seq" => Ok(Self::Sequential),
            "shared" | "omp" => Ok(Self::Shared),
            "distributed" | "mpi" => Ok(Self::Distributed),
            _ => Err(format!(
                "unknown strategy `{s}`, expected sequential, shared or distributed"
            )),
        }
    }
}

impl StrategyKind {
    fn with_workers(self, num_workers: usize) -> ExecutionStrategy {
        match self {
            StrategyKind::Sequential => ExecutionStrategy::Serial,
            StrategyKind::Shared => ExecutionStrategy::Fixed(num_workers),
            StrategyKind::Distributed => ExecutionStrategy::Distributed(num_workers),
        }
    }
}

/// Where the outputs of one strategy go.
struct OutputLayout {
    root: PathBuf,
    tag: &'static str,
}

impl OutputLayout {
    fn new(output_dir: &Path, tag: &'static str) -> Self {
        Self {
            root: output_dir.join(tag),
            tag,
        }
    }

    fn path(&self, stage: &str, name: &str) -> PathBuf {
        self.root
            .join(stage)
            .join(format!("{name}_{stage}_{}.png", self.tag))
    }

    fn combined(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}_{}.png", self.tag))
    }
}

fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();
    match args.command {
        Command::Equalize(args) => run_equalize(args)?,
        Command::Combine(args) => run_combine(args)?,
    }

    Ok(())
}

fn run_equalize(args: EqualizeArgs) -> Result<(), BoxError> {
    let num_workers = args.num_workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let strategy = args.strategy.with_workers(num_workers);
    log::info!("equalizing {} with {:?}", args.image_path.display(), strategy);

    let (before, out, elapsed) = match strategy {
        ExecutionStrategy::Distributed(num_ranks) => {
            equalize_distributed(&args.image_path, num_ranks)?
        }
        _ => {
            let image = F::read_image_any_gray8(&args.image_path)?;
            let before = image.clone();
            let (out, elapsed) = measure_runtime(|| equalize_histogram(image, strategy));
            (before, out?, elapsed)
        }
    };

    write_outputs(&OutputLayout::new(&args.output_dir, strategy.tag()), &before, &out)?;

    if !args.quiet {
        print!("\n{}", histogram_ascii(&out.hist_before, "Histogram BEFORE Equalization"));
        print!("\n{}", histogram_ascii(&out.hist_after, "Histogram AFTER Equalization"));
    }
    println!("Runtime: {:.3} ms", elapsed.as_secs_f64() * 1e3);

    if let Some(path) = &args.runtime_log {
        RuntimeLog::new(path).append(&RuntimeRecord {
            strategy: strategy.tag().to_string(),
            workers: strategy.num_workers(),
            width: before.width(),
            height: before.height(),
            elapsed,
        })?;
    }

    Ok(())
}

/// Run the rank program on `num_ranks` ranks; only the coordinator reads the image.
fn equalize_distributed(
    image_path: &Path,
    num_ranks: usize,
) -> Result<(Image<u8, 1>, EqualizeOutput, Duration), BoxError> {
    if num_ranks == 0 {
        return Err("the distributed strategy needs at least one rank".into());
    }
    let mut inputs = vec![Some(image_path.to_path_buf())];
    inputs.extend((1..num_ranks).map(|_| None));

    let results = run_world(inputs, |comm, path| -> Result<_, IoError> {
        let Some(path) = path else {
            return Ok((None, equalize_rank(&comm, None, PostHistogram::Scan)));
        };

        let image = match F::read_image_any_gray8(&path) {
            Ok(image) => image,
            Err(e) => {
                comm.abort();
                return Err(e);
            }
        };
        let before = image.clone();
        let (out, elapsed) =
            measure_runtime(|| equalize_rank(&comm, Some(image), PostHistogram::Scan));
        Ok((Some((before, elapsed)), out))
    })?;

    let mut timing = None;
    let mut outputs = Vec::with_capacity(results.len());
    for res in results {
        let (run, out) = res?;
        timing = timing.or(run);
        outputs.push(out);
    }

    let out = coordinator_output(outputs)?;
    let (before, elapsed) = timing.ok_or("coordinator returned no output")?;
    Ok((before, out, elapsed))
}

fn write_outputs(
    layout: &OutputLayout,
    before: &Image<u8, 1>,
    out: &EqualizeOutput,
) -> Result<(), BoxError> {
    std::fs::create_dir_all(layout.root.join("before"))?;
    std::fs::create_dir_all(layout.root.join("after"))?;

    let hist_before = draw_histogram(&out.hist_before)?;
    let hist_after = draw_histogram(&out.hist_after)?;

    F::write_image_gray8(layout.path("before", "image"), before)?;
    F::write_image_gray8(layout.path("before", "histogram"), &hist_before)?;
    F::write_image_gray8(layout.path("after", "image"), &out.image)?;
    F::write_image_gray8(layout.path("after", "histogram"), &hist_after)?;

    let before_combined = stack_images(
        before,
        &hist_before,
        StackDirection::Horizontal,
        DEFAULT_DIVIDER_PERCENT,
        0,
    )?;
    let after_combined = stack_images(
        &out.image,
        &hist_after,
        StackDirection::Horizontal,
        DEFAULT_DIVIDER_PERCENT,
        0,
    )?;
    let result = stack_images(
        &before_combined,
        &after_combined,
        StackDirection::Vertical,
        DEFAULT_DIVIDER_PERCENT,
        0,
    )?;

    F::write_image_gray8(layout.combined("before_combined"), &before_combined)?;
    F::write_image_gray8(layout.combined("after_combined"), &after_combined)?;
    F::write_image_gray8(layout.combined("result"), &result)?;

    log::info!("saved outputs to {}", layout.root.display());
    Ok(())
}

fn run_combine(args: CombineArgs) -> Result<(), BoxError> {
    let mut combined: Option<Image<u8, 1>> = None;
    for tag in ["seq", "shared", "distributed"] {
        let path = OutputLayout::new(&args.output_dir, tag).combined("result");
        let image = F::read_image_any_gray8(&path)
            .map_err(|e| format!("failed to load {}: {e}", path.display()))?;

        combined = Some(match combined {
            None => image,
            Some(acc) => stack_images(
                &acc,
                &image,
                StackDirection::Horizontal,
                DEFAULT_DIVIDER_PERCENT,
                0,
            )?,
        });
    }

    if let Some(combined) = combined {
        let path = args.output_dir.join("result_all.png");
        F::write_image_gray8(&path, &combined)?;
        println!("Saved final combined image to: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use histeq::image::ImageSize;

    use super::*;

    fn four_levels() -> Result<Image<u8, 1>, BoxError> {
        Ok(Image::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0, 85, 170, 255],
        )?)
    }

    #[test]
    fn test_write_outputs() -> Result<(), BoxError> {
        let tmp_dir = tempfile::tempdir()?;
        let image = four_levels()?;
        let out = equalize_histogram(image.clone(), ExecutionStrategy::Serial)?;

        let layout = OutputLayout::new(tmp_dir.path(), "seq");
        write_outputs(&layout, &image, &out)?;

        let expected = [
            layout.path("before", "image"),
            layout.path("before", "histogram"),
            layout.path("after", "image"),
            layout.path("after", "histogram"),
            layout.combined("before_combined"),
            layout.combined("after_combined"),
            layout.combined("result"),
        ];
        for path in &expected {
            assert!(path.exists(), "missing {}", path.display());
        }

        let after = F::read_image_any_gray8(layout.path("after", "image"))?;
        assert_eq!(after.as_slice(), &[64, 128, 191, 255]);
        Ok(())
    }

    #[test]
    fn test_combine() -> Result<(), BoxError> {
        let tmp_dir = tempfile::tempdir()?;
        let image = four_levels()?;
        for strategy in [
            ExecutionStrategy::Serial,
            ExecutionStrategy::Fixed(2),
            ExecutionStrategy::Distributed(2),
        ] {
            let out = equalize_histogram(image.clone(), strategy)?;
            write_outputs(&OutputLayout::new(tmp_dir.path(), strategy.tag()), &image, &out)?;
        }

        run_combine(CombineArgs {
            output_dir: tmp_dir.path().to_path_buf(),
        })?;

        let result = OutputLayout::new(tmp_dir.path(), "seq").combined("result");
        let single = F::read_image_any_gray8(result)?;
        let combined = F::read_image_any_gray8(tmp_dir.path().join("result_all.png"))?;
        assert_eq!(combined.height(), single.height());
        assert!(combined.width() > 3 * single.width());
        Ok(())
    }

    #[test]
    fn test_combine_missing_input() -> Result<(), BoxError> {
        let tmp_dir = tempfile::tempdir()?;
        let res = run_combine(CombineArgs {
            output_dir: tmp_dir.path().to_path_buf(),
        });
        assert!(res.is_err());
        assert!(!tmp_dir.path().join("result_all.png").exists());
        Ok(())
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("seq".parse::<StrategyKind>(), Ok(StrategyKind::Sequential));
        assert_eq!("shared".parse::<StrategyKind>(), Ok(StrategyKind::Shared));
        assert_eq!("mpi".parse::<StrategyKind>(), Ok(StrategyKind::Distributed));
        assert!("gpu".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_output_layout() {
        let layout = OutputLayout::new(Path::new("out"), "seq");
        assert_eq!(
            layout.path("before", "histogram"),
            PathBuf::from("out/seq/before/histogram_before_seq.png")
        );
        assert_eq!(
            layout.combined("result"),
            PathBuf::from("out/seq/result_seq.png")
        );
    }
}
