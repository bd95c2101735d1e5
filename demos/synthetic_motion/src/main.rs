use argh::FromArgs;

use motionflow::image::{Image, ImageSize};
use motionflow::imgproc::parallel::ExecutionStrategy;
use motionflow::motion::{
    ExtractorConfig, FrameMotionCombiner, FrameSequence, MotionField, MotionVectorExtractor,
};

#[derive(FromArgs)]
/// Extract the motion of a synthetic translating pattern
struct Args {
    /// number of frames to generate
    #[argh(option, short = 'n', default = "4")]
    num_frames: usize,

    /// width of the frames
    #[argh(option, default = "160")]
    width: usize,

    /// height of the frames
    #[argh(option, default = "120")]
    height: usize,

    /// horizontal displacement between two frames in pixels
    #[argh(option, default = "2.0")]
    dx: f32,

    /// vertical displacement between two frames in pixels
    #[argh(option, default = "1.0")]
    dy: f32,

    /// compute the frame pairs in parallel
    #[argh(switch, short = 'p')]
    parallel: bool,
}

/// Smooth RGB texture, each channel with its own frequencies.
fn texture(x: f32, y: f32) -> [u8; 3] {
    use std::f32::consts::PI;
    let wave = |px: f32, py: f32| {
        let v = 128.0 + 60.0 * (2.0 * PI * x / px).sin() + 60.0 * (2.0 * PI * y / py).cos();
        v.clamp(0.0, 255.0) as u8
    };
    [wave(23.0, 19.0), wave(31.0, 17.0), wave(19.0, 29.0)]
}

fn mean_flow(field: &MotionField) -> (f32, f32) {
    let n = (field.width() * field.height()) as f32;
    let (sx, sy) = field
        .as_slice()
        .chunks_exact(2)
        .fold((0.0, 0.0), |(sx, sy), d| (sx + d[0], sy + d[1]));
    (sx / n, sy / n)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let size = ImageSize {
        width: args.width,
        height: args.height,
    };

    // frame k shows the texture moved by k times the displacement
    let frames = (0..args.num_frames)
        .map(|k| {
            let (ox, oy) = (args.dx * k as f32, args.dy * k as f32);
            Image::<u8, 3>::from_size_fn(size, |x, y| texture(x as f32 - ox, y as f32 - oy))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let frames = FrameSequence::Byte(frames);

    let strategy = if args.parallel {
        ExecutionStrategy::ParallelElements
    } else {
        ExecutionStrategy::Serial
    };
    let extractor = MotionVectorExtractor::new(ExtractorConfig {
        strategy,
        ..Default::default()
    });

    let fields = extractor.extract(&frames)?;
    let combined = FrameMotionCombiner::new().combine(&frames, &fields)?;

    for (i, field) in fields.iter().enumerate() {
        let (mx, my) = mean_flow(field);
        println!(
            "pair {} -> {}: mean flow ({:.3}, {:.3}), expected ({:.3}, {:.3})",
            i,
            i + 1,
            mx,
            my,
            args.dx,
            args.dy
        );
    }

    if let Some(tensor) = combined.first() {
        println!(
            "{} combined tensors of shape {:?}",
            combined.len(),
            tensor.shape()
        );
    }

    Ok(())
}
