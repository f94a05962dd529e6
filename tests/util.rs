// This is almost certainly not all used in all tests.
#![allow(dead_code)]
use std::hash::Hasher;
use std::path::Path;

use laminate::command::{CommandBuffer, Register};
use laminate::pool::{Pool, PoolImage, PoolKey};
use laminate::run::{Executor, Retire};

const CRC: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/reference");

pub fn assert_reference(image: PoolImage, key: &str) {
    let image = image
        .to_image()
        .expect("Invalid image, must be convertible to `image` image");
    assert_reference_image(image, key);
}

pub fn assert_reference_image(image: image::RgbaImage, key: &str) {
    let mut crc = crc32fast::Hasher::new();
    crc.write_u32(image.width());
    crc.write_u32(image.height());

    crc.write(image.as_raw());
    let crc = crc.finish();

    let output = Path::new(CRC).join(key);

    if std::env::var_os("LAMINATE_BLESS").is_some() {
        std::fs::write(&output, format!("{}", crc)).expect("Failed to bless result");
    }

    let expected = std::fs::read(&output).expect("Failed to read result file");

    let expected: u64 = ::core::str::from_utf8(&expected)
        .expect("Failed to read result file")
        .parse()
        .expect("Failed to parse result file as 64-bit CRC");

    assert!(
        expected == crc,
        "Reference CRC-32 comparison failed: {} vs. {}",
        expected,
        crc,
    );
}

pub fn run_once_with_output<T>(
    commands: CommandBuffer,
    pool: &mut Pool,
    binds: impl IntoIterator<Item = (Register, PoolKey)>,
    output: impl FnOnce(&mut Retire) -> T,
) -> T {
    run_on_executor_with_output(commands, pool, &Executor::default(), binds, output)
}

pub fn run_on_executor_with_output<T>(
    commands: CommandBuffer,
    pool: &mut Pool,
    executor: &Executor,
    binds: impl IntoIterator<Item = (Register, PoolKey)>,
    output: impl FnOnce(&mut Retire) -> T,
) -> T {
    let plan = commands.compile().expect("Could build command buffer");

    let mut launcher = plan.launch(pool);

    for (target, key) in binds {
        launcher = launcher.bind(target, key).unwrap();
    }

    let mut execution = launcher.launch(executor).expect("Launching failed");

    while execution.is_running() {
        let _wait_point = execution.step().expect("Shouldn't fail but");
    }

    let mut retire = execution.retire_gracefully(pool);
    let result = output(&mut retire);
    retire.finish();
    result
}

pub fn retire_with_one_image(reg: Register) -> impl FnOnce(&mut Retire) -> PoolKey {
    move |retire: &mut Retire| retire.output(reg).expect("Valid for output").key()
}
