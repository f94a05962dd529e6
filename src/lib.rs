//! ## Quick guide
//!
//! 1. Create a Pool of image resources
//! 2. Create a CommandBuffer for describing the operations
//! 3. Fill the resource pool with input layers
//! 4. Enqueue commands to the buffer and compile it
//! 5. Launch the program on an executor, stepping it to completion
//! 6. Retrieve results
//!
//! For steps 3 and 6, input and output, you might find the `image` crate quite helpful for
//! moving between encoded images and the packed word buffers used here.

pub mod buffer;
pub mod command;
pub mod kernels;
pub mod pool;
pub mod program;
pub mod run;
