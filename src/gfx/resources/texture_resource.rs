//! Texture resource management
//!
//! CPU-side [`Image`] pixel data and the device [`Texture`] created from it.

use cgmath::{Matrix4, SquareMatrix};

use crate::error::{GfxError, GfxResult};
use crate::gfx::device::{SharedDevice, TextureHandle};

/// Tightly packed RGBA8 pixels, rows bottom to top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    /// Wraps raw RGBA8 data, rejecting a buffer whose length does not match
    /// `width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> GfxResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(GfxError::ImageSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Single-color image.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Square checkerboard of `size` pixels with `cells` squares per side.
    ///
    /// # Arguments
    /// * `size` - Width and height in pixels
    /// * `cells` - Squares per side, raised to at least one
    /// * `even` - Color of the square at the origin
    /// * `odd` - Color of its neighbours
    pub fn checkerboard(size: u32, cells: u32, even: [u8; 4], odd: [u8; 4]) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let color = if (x / cell + y / cell) % 2 == 0 { even } else { odd };
                pixels.extend_from_slice(&color);
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at `(x, y)`, `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * 4;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.pixels[start..start + 4]);
        Some(rgba)
    }
}

/// Device texture plus the matrix applied to its coordinates.
///
/// The device texture is released when the `Texture` is dropped.
pub struct Texture {
    device: SharedDevice,
    handle: TextureHandle,
    width: u32,
    height: u32,
    mipmaps: bool,
    /// Uploaded as `texture_transformation_matrix` whenever the texture is bound.
    pub transformation: Matrix4<f32>,
}

impl Texture {
    pub fn new(device: &SharedDevice, image: &Image, generate_mipmaps: bool) -> Self {
        let handle = device.create_texture(
            image.width(),
            image.height(),
            image.pixels(),
            generate_mipmaps,
        );
        log::debug!(
            "uploaded {}x{} texture {:?} (mipmaps: {})",
            image.width(),
            image.height(),
            handle,
            generate_mipmaps
        );

        Self {
            device: device.clone(),
            handle,
            width: image.width(),
            height: image.height(),
            mipmaps: generate_mipmaps,
            transformation: Matrix4::identity(),
        }
    }

    /// Builder pattern: sets the texture coordinate transformation
    pub fn with_transformation(mut self, transformation: Matrix4<f32>) -> Self {
        self.transformation = transformation;
        self
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_mipmaps(&self) -> bool {
        self.mipmaps
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.device.delete_texture(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::HeadlessDevice;
    use std::rc::Rc;

    #[test]
    fn test_from_rgba8_checks_length() {
        assert!(Image::from_rgba8(2, 2, vec![0; 16]).is_ok());

        let error = Image::from_rgba8(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            error,
            GfxError::ImageSize {
                expected: 16,
                actual: 15,
                ..
            }
        ));
    }

    #[test]
    fn test_checkerboard_alternates() {
        let black = [0, 0, 0, 255];
        let white = [255, 255, 255, 255];
        let image = Image::checkerboard(8, 4, black, white);

        assert_eq!(image.pixels().len(), 8 * 8 * 4);
        assert_eq!(image.pixel(0, 0), Some(black));
        assert_eq!(image.pixel(1, 1), Some(black));
        assert_eq!(image.pixel(2, 0), Some(white));
        assert_eq!(image.pixel(2, 2), Some(black));
        assert_eq!(image.pixel(8, 0), None);
    }

    #[test]
    fn test_solid_fills_every_pixel() {
        let image = Image::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(image.pixels().len(), 24);
        assert_eq!(image.pixel(2, 1), Some([1, 2, 3, 4]));
    }

    #[test]
    fn test_texture_released_on_drop() {
        let headless = Rc::new(HeadlessDevice::new());
        let device: SharedDevice = headless.clone();

        let texture = Texture::new(&device, &Image::solid(4, 4, [255; 4]), true)
            .with_transformation(Matrix4::from_scale(2.0));
        assert_eq!(texture.size(), (4, 4));
        assert!(texture.has_mipmaps());
        assert_eq!(headless.live_textures(), 1);

        drop(texture);
        assert_eq!(headless.live_textures(), 0);
        assert_eq!(headless.double_releases(), 0);
    }
}
