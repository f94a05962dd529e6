//! Flattens two demonstration stacks: a 4×4 stack filled with a diagonal test pattern and a
//! 256×256 stack of solid colors.
use laminate::buffer::{ImageBuffer, LayerLayout};
use laminate::command::CommandBuffer;
use laminate::pool::Pool;
use laminate::run::Executor;

const EXPECTED_PATTERN: [u32; 16] = [
    0x00f600ff, 0x00f600ff, 0x01f600ff, 0x02f600ff, 0x03f600ff, 0x04f600ff, 0x05f600ff,
    0x06f600ff, 0x07f600ff, 0x08f600ff, 0x09f600ff, 0x0af600ff, 0x0bf600ff, 0x0cf600ff,
    0x0df600ff, 0x0ef600ff,
];

fn main() {
    env_logger::init();

    run_pattern();
    run_solid();
}

/// Three 4×4 layers of a deterministic test pattern.
fn run_pattern() {
    let layout = LayerLayout::with_width_height(4, 4).expect("A non-empty layout");

    let layers = (0..3u32)
        .map(|l| {
            let mut buffer = ImageBuffer::with_layout(&layout);
            for (i, texel) in buffer.as_texels_mut().iter_mut().enumerate() {
                *texel = 0x00ff0000 + (l + 0xaa) % 0xff + ((i as u32 % 0xff) << 24);
            }
            buffer
        })
        .collect::<Vec<_>>();

    println!("input buffer:");
    for buffer in &layers {
        print_words(buffer.as_texels());
    }

    let mut pool = Pool::new();
    let keys = layers
        .into_iter()
        .map(|buffer| pool.insert(buffer).key())
        .collect::<Vec<_>>();

    let mut commands = CommandBuffer::default();
    let inputs = keys
        .iter()
        .map(|_| commands.input(layout).expect("Valid input layout"))
        .collect::<Vec<_>>();
    let result = commands.combine(&inputs).expect("Valid to combine");
    let (output, _layout) = commands.output(result).expect("Valid for output");

    let plan = commands.compile().expect("Could build command buffer");

    let mut launcher = plan.launch(&mut pool);
    for (&register, &key) in inputs.iter().zip(&keys) {
        launcher = launcher.bind(register, key).expect("Image binds to input");
    }

    let mut execution = launcher.launch(&Executor::default()).expect("Launching failed");

    while execution.is_running() {
        let _wait_point = execution.step().expect("Shouldn't fail but");
    }

    let mut retire = execution.retire_gracefully(&mut pool);
    let image = retire.output(output).expect("A valid image output");
    let texels = image.texels().expect("Host data of the output");

    println!("output buffer:");
    print_words(texels);

    for (index, (&found, &expected)) in texels.iter().zip(&EXPECTED_PATTERN).enumerate() {
        assert!(
            found == expected,
            "index: {}, 0x{:08x}",
            index,
            found,
        );
    }
    retire.finish();
}

/// Three solid 256×256 layers, red under green under a dim blue-green.
fn run_solid() {
    let layout = LayerLayout::with_width_height(256, 256).expect("A non-empty layout");

    let mut pool = Pool::new();
    let mut commands = CommandBuffer::default();

    let bottom = commands.solid(layout, 0xff0000ff).expect("Valid layout");
    let middle = commands.solid(layout, 0x00ff00ff).expect("Valid layout");
    let top = commands.solid(layout, 0x0f1f1aff).expect("Valid layout");

    let result = commands
        .combine(&[bottom, middle, top])
        .expect("Valid to combine");
    let (output, _layout) = commands.output(result).expect("Valid for output");

    let plan = commands.compile().expect("Could build command buffer");

    let mut execution = plan
        .launch(&mut pool)
        .launch(&Executor::default())
        .expect("Launching failed");

    while execution.is_running() {
        let _wait_point = execution.step().expect("Shouldn't fail but");
    }

    let mut retire = execution.retire_gracefully(&mut pool);
    let image = retire.output(output).expect("A valid image output");
    let texels = image.texels().expect("Host data of the output");

    println!("flattened solid stack: 0x{:08x}", texels[0]);
    assert!(texels[0] == 0x5a5f08ff, "0x{:08x}", texels[0]);
    assert!(texels.iter().all(|&texel| texel == texels[0]));
    retire.finish();
}

fn print_words(words: &[u32]) {
    let words = words
        .iter()
        .map(|word| format!("0x{:08x}", word))
        .collect::<Vec<_>>();
    println!("{}", words.join(", "));
}
