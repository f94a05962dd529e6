//! Adds two buffers element-wise through the same pipeline that flattens layers.
use laminate::buffer::{ImageBuffer, LayerLayout};
use laminate::command::CommandBuffer;
use laminate::pool::Pool;
use laminate::run::Executor;

const LENGTH: u32 = 1024;

fn main() {
    env_logger::init();

    let layout = LayerLayout::with_width_height(LENGTH, 1).expect("A non-empty layout");

    let mut lhs = ImageBuffer::with_layout(&layout);
    let mut rhs = ImageBuffer::with_layout(&layout);
    for (i, texel) in lhs.as_texels_mut().iter_mut().enumerate() {
        *texel = i as u32;
    }
    for (i, texel) in rhs.as_texels_mut().iter_mut().enumerate() {
        *texel = 2 * i as u32;
    }

    let mut pool = Pool::new();
    let lhs_key = pool.insert(lhs).key();
    let rhs_key = pool.insert(rhs).key();

    let mut commands = CommandBuffer::default();
    let lhs = commands.input(layout).expect("Valid input layout");
    let rhs = commands.input(layout).expect("Valid input layout");
    let sum = commands.add(lhs, rhs).expect("Valid to add");
    let (output, _layout) = commands.output(sum).expect("Valid for output");

    let plan = commands.compile().expect("Could build command buffer");

    let mut execution = plan
        .launch(&mut pool)
        .bind(lhs, lhs_key)
        .expect("Image binds to input")
        .bind(rhs, rhs_key)
        .expect("Image binds to input")
        .launch(&Executor::default())
        .expect("Launching failed");

    while execution.is_running() {
        let _wait_point = execution.step().expect("Shouldn't fail but");
    }

    let mut retire = execution.retire_gracefully(&mut pool);
    let image = retire.output(output).expect("A valid image output");
    let texels = image.texels().expect("Host data of the output");

    let correct = texels
        .iter()
        .enumerate()
        .filter(|&(i, &texel)| texel == 3 * i as u32)
        .count();

    println!("C = A + B: {} out of {} results were correct.", correct, LENGTH);
    assert!(correct == LENGTH as usize);
    retire.finish();
}
