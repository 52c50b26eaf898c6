use image::DynamicImage;
use tract_core::internal::*;

pub const DEFAULT_INPUT_SIZE: usize = 224;

/// Turns a decoded image into the model input: NHWC `[1, size, size, 3]`,
/// f32, in `[-1, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preprocessor {
    pub size: usize,
}

impl Default for Preprocessor {
    fn default() -> Preprocessor {
        Preprocessor { size: DEFAULT_INPUT_SIZE }
    }
}

impl Preprocessor {
    pub fn new(size: usize) -> Preprocessor {
        Preprocessor { size }
    }

    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.size, self.size, 3]
    }

    pub fn tensor(&self, image: &DynamicImage) -> TractResult<Tensor> {
        let rgb = image.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        if width == 0 || height == 0 {
            bail!("Empty image ({}x{})", width, height)
        }
        let size = self.size;
        let input = tract_ndarray::Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
            let sx = nearest(x, width, size);
            let sy = nearest(y, height, size);
            normalize(rgb[(sx as u32, sy as u32)].0[c])
        });
        Ok(input.into())
    }
}

/// Legacy TensorFlow nearest neighbour: no half-pixel centers, no corner
/// alignment.
fn nearest(dst: usize, input: usize, output: usize) -> usize {
    (dst * input / output).min(input - 1)
}

fn normalize(pixel: u8) -> f32 {
    pixel as f32 / 127.5 - 1.0
}
