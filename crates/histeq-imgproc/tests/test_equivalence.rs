use histeq_image::{Image, ImageError, ImageSize};
use histeq_imgproc::equalize::distributed::PostHistogram;
use histeq_imgproc::equalize::{
    equalize_histogram, DistributedEqualizer, EqualizeError, Equalizer, SequentialEqualizer,
    SharedMemoryEqualizer,
};
use histeq_imgproc::histogram::compute_histogram;
use histeq_imgproc::lut::EqualizationMap;
use histeq_imgproc::parallel::ExecutionStrategy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_image(rng: &mut StdRng, width: usize, height: usize) -> Result<Image<u8, 1>, ImageError> {
    // skewed towards dark values so the equalization has something to do
    let data = (0..width * height)
        .map(|_| {
            let v: u8 = rng.random();
            v / rng.random_range(1..4u8)
        })
        .collect();
    Image::new(ImageSize { width, height }, data)
}

#[test]
fn test_cross_strategy_equivalence() -> Result<(), EqualizeError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = StdRng::seed_from_u64(42);

    for (width, height) in [(1, 1), (3, 7), (17, 5), (64, 33), (5, 128)] {
        let image = random_image(&mut rng, width, height)?;
        let expected = SequentialEqualizer.equalize(image.clone())?;

        for n in 1..=6 {
            let shared = SharedMemoryEqualizer::new(n).equalize(image.clone())?;
            assert_eq!(shared, expected, "shared {width}x{height} n={n}");

            let distributed = DistributedEqualizer::new(n).equalize(image.clone())?;
            assert_eq!(distributed, expected, "distributed {width}x{height} n={n}");
        }
    }
    Ok(())
}

#[test]
fn test_mass_conservation() -> Result<(), EqualizeError> {
    let mut rng = StdRng::seed_from_u64(7);
    let image = random_image(&mut rng, 40, 30)?;

    for strategy in [
        ExecutionStrategy::Serial,
        ExecutionStrategy::Fixed(3),
        ExecutionStrategy::Distributed(4),
    ] {
        let out = equalize_histogram(image.clone(), strategy)?;
        assert_eq!(out.hist_before.total(), 40 * 30);
        assert_eq!(out.hist_after.total(), 40 * 30);
        assert_eq!(out.hist_before, compute_histogram(&image));
        assert_eq!(out.hist_after, compute_histogram(&out.image));
    }
    Ok(())
}

#[test]
fn test_lut_monotonic_on_random_histograms() -> Result<(), EqualizeError> {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..20 {
        let width = rng.random_range(1..50);
        let height = rng.random_range(1..50);
        let image = random_image(&mut rng, width, height)?;

        let map = EqualizationMap::from_histogram(&compute_histogram(&image), image.num_pixels())?;
        assert!(map.lut.is_monotonic());
    }
    Ok(())
}

#[test]
fn test_output_is_lut_of_input() -> Result<(), EqualizeError> {
    let mut rng = StdRng::seed_from_u64(99);
    let image = random_image(&mut rng, 23, 19)?;

    let map = EqualizationMap::from_histogram(&compute_histogram(&image), image.num_pixels())?;
    let out = equalize_histogram(image.clone(), ExecutionStrategy::Distributed(5))?;

    for (src, dst) in image.as_slice().iter().zip(out.image.as_slice()) {
        assert_eq!(map.lut[*src], *dst);
    }
    Ok(())
}

#[test]
fn test_post_histogram_reduction_matches_scan() -> Result<(), EqualizeError> {
    let mut rng = StdRng::seed_from_u64(5);
    let image = random_image(&mut rng, 31, 29)?;

    let scan = DistributedEqualizer::new(6).equalize(image.clone())?;
    let reduce = DistributedEqualizer::new(6)
        .with_post_histogram(PostHistogram::Reduce)
        .equalize(image.clone())?;
    let shared = SharedMemoryEqualizer::new(6).equalize(image)?;

    assert_eq!(scan.hist_after, reduce.hist_after);
    assert_eq!(scan.hist_after, shared.hist_after);
    Ok(())
}

#[test]
fn test_empty_image_rejected_by_every_strategy() -> Result<(), EqualizeError> {
    let image = Image::<u8, 1>::new(ImageSize { width: 0, height: 0 }, vec![])?;
    for strategy in [
        ExecutionStrategy::Serial,
        ExecutionStrategy::Fixed(2),
        ExecutionStrategy::Distributed(3),
    ] {
        assert_eq!(
            equalize_histogram(image.clone(), strategy),
            Err(EqualizeError::EmptyImage(0, 0))
        );
    }
    Ok(())
}
