//! Properties that hold for every stack, independent of the concrete pixel data.
use laminate::buffer::{ImageBuffer, LayerLayout};
use laminate::command::CommandBuffer;
use laminate::pool::{Pool, PoolKey};
use laminate::run::Executor;

#[path = "util.rs"]
mod util;

/// Flatten a stack of host layers on the given executor, returning the output words.
fn combine_stack(layers: Vec<ImageBuffer>, executor: &Executor) -> Vec<u32> {
    let layout = *layers.first().expect("A non-empty stack").layout();

    let mut pool = Pool::new();
    let keys = layers
        .into_iter()
        .map(|buffer| pool.insert(buffer).key())
        .collect::<Vec<PoolKey>>();

    let mut commands = CommandBuffer::default();
    let inputs = keys
        .iter()
        .map(|_| commands.input(layout).unwrap())
        .collect::<Vec<_>>();
    let result = commands.combine(&inputs).expect("Valid to combine");
    let (output, _layout) = commands.output(result).expect("Valid for output");

    let binds = inputs.iter().copied().zip(keys).collect::<Vec<_>>();
    let result = util::run_on_executor_with_output(
        commands,
        &mut pool,
        executor,
        binds,
        util::retire_with_one_image(output),
    );

    let image = pool.entry(result).unwrap();
    image.texels().expect("Host data of the output").to_vec()
}

fn noise_layer(layout: &LayerLayout, seed: u32) -> ImageBuffer {
    let mut buffer = ImageBuffer::with_layout(layout);
    let mut state = seed.wrapping_mul(0x9e3779b9).wrapping_add(1);
    for texel in buffer.as_texels_mut() {
        // Xorshift, good enough to decorrelate the channels.
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        *texel = state;
    }
    buffer
}

#[test]
fn shape_preservation() {
    let _ = env_logger::try_init();

    for &(width, height) in &[(1u32, 1u32), (3, 5), (64, 2), (7, 31)] {
        let layout = LayerLayout::with_width_height(width, height).expect("A non-empty layout");
        let layers = (0..3).map(|l| noise_layer(&layout, l)).collect();
        let texels = combine_stack(layers, &Executor::Sequential);
        assert_eq!(texels.len(), layout.len());
        assert!(texels.iter().all(|&texel| texel & 0xff == 0xff));
    }
}

#[test]
fn single_texel_stack() {
    let _ = env_logger::try_init();

    let layout = LayerLayout::with_width_height(1, 1).expect("A non-empty layout");
    let layers = [0xff0000ff, 0x00ff00ff, 0x0f1f1aff]
        .iter()
        .map(|&texel| {
            ImageBuffer::with_texels(&layout, vec![texel]).expect("One texel fits the layout")
        })
        .collect::<Vec<_>>();

    let texels = combine_stack(layers, &Executor::Sequential);
    assert_eq!(texels, [0x5a5f08ff]);
}

#[test]
fn texel_locality() {
    let _ = env_logger::try_init();

    let layout = LayerLayout::with_width_height(4, 4).expect("A non-empty layout");
    let baseline = || (0..3).map(|l| noise_layer(&layout, l)).collect::<Vec<_>>();

    let expected = combine_stack(baseline(), &Executor::Sequential);

    let mut disturbed = baseline();
    disturbed[1].as_texels_mut()[5] ^= 0xffffffff;
    let found = combine_stack(disturbed, &Executor::Sequential);

    for (index, (&expected, &found)) in expected.iter().zip(&found).enumerate() {
        if index != 5 {
            assert_eq!(expected, found, "interference at texel {}", index);
        }
    }
}

#[test]
fn executor_equivalence() {
    let _ = env_logger::try_init();

    let layout = LayerLayout::with_width_height(33, 9).expect("A non-empty layout");
    let layers = || (0..4).map(|l| noise_layer(&layout, l)).collect::<Vec<_>>();

    let sequential = combine_stack(layers(), &Executor::Sequential);
    let parallel = combine_stack(layers(), &Executor::Parallel);
    assert_eq!(sequential, parallel);
}

#[test]
fn wrapping_addition() {
    let _ = env_logger::try_init();

    let layout = LayerLayout::with_width_height(4, 1).expect("A non-empty layout");

    let mut pool = Pool::new();
    let lhs_buffer = ImageBuffer::with_texels(&layout, vec![1, u32::MAX, 0x80000000, 7])
        .expect("Texel count matches the layout");
    let rhs_buffer = ImageBuffer::with_texels(&layout, vec![2, 1, 0x80000000, 0])
        .expect("Texel count matches the layout");
    let lhs_key = pool.insert(lhs_buffer).key();
    let rhs_key = pool.insert(rhs_buffer).key();

    let mut commands = CommandBuffer::default();
    let lhs = commands.input(layout).unwrap();
    let rhs = commands.input(layout).unwrap();
    let sum = commands.add(lhs, rhs).expect("Valid to add");
    let (output, _layout) = commands.output(sum).expect("Valid for output");

    let result = util::run_once_with_output(
        commands,
        &mut pool,
        vec![(lhs, lhs_key), (rhs, rhs_key)],
        util::retire_with_one_image(output),
    );

    let image = pool.entry(result).unwrap();
    let texels = image.texels().expect("Host data of the output");
    assert_eq!(texels, [3, 0, 0, 7]);
}

#[test]
fn conflicting_shapes_rejected() {
    let small = LayerLayout::with_width_height(2, 2).expect("A non-empty layout");
    let large = LayerLayout::with_width_height(4, 4).expect("A non-empty layout");

    let mut commands = CommandBuffer::default();
    let lhs = commands.input(small).unwrap();
    let rhs = commands.input(large).unwrap();

    let err = commands.combine(&[lhs, rhs]).err().expect("Layouts disagree");
    assert!(err.is_shape_err());

    let err = commands.combine(&[]).err().expect("Nothing to combine");
    assert!(err.is_shape_err());

    let err = commands.add(lhs, rhs).err().expect("Layouts disagree");
    assert!(err.is_shape_err());
}

#[test]
fn launch_rejects_bad_binds() {
    let _ = env_logger::try_init();

    let layout = LayerLayout::with_width_height(4, 4).expect("A non-empty layout");
    let other = LayerLayout::with_width_height(2, 2).expect("A non-empty layout");

    let mut pool = Pool::new();
    let mismatched = pool.insert(ImageBuffer::with_layout(&other)).key();
    let declared = pool.declare(layout).key();

    let mut commands = CommandBuffer::default();
    let input = commands.input(layout).unwrap();
    let (_output, _layout) = commands.output(input).expect("Valid for output");

    let plan = commands.compile().expect("Could build command buffer");

    assert!(plan.launch(&mut pool).bind(input, mismatched).is_err());
    assert!(plan.launch(&mut pool).bind(input, declared).is_err());
    // An unbound input may not launch either.
    assert!(plan.launch(&mut pool).launch(&Executor::Sequential).is_err());
}

#[test]
fn empty_commands_rejected() {
    let commands = CommandBuffer::default();
    let err = commands.compile().err().expect("Nothing to lower");
    assert!(err.is_empty_err());
}
