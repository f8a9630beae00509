//! Logo format and size constraints.

use log::debug;
use std::path::Path;

use crate::error::ValidationError;

/// Side of the bounding box a raster logo must fit in.
pub const IMAGE_SIZE: u32 = 512;

fn is_vector(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

/// True if `width`x`height` fits in the `bound` box with one side exactly `bound`.
pub fn fits_bounding_box(width: u32, height: u32, bound: u32) -> bool {
    (width == bound && height <= bound) || (height == bound && width <= bound)
}

/// Checks that the logo exists and is either an SVG or a raster image that
/// fits in the [`IMAGE_SIZE`] box with at least one side exactly [`IMAGE_SIZE`].
#[tracing::instrument]
pub fn check_image(path: &Path) -> Result<(), ValidationError> {
    if !path.exists() {
        return Err(ValidationError::ImageMissing {
            path: path.to_path_buf(),
        });
    }

    if is_vector(path) {
        debug!("{} is a vector image, skipping size check", path.display());
        return Ok(());
    }

    let (width, height) =
        image::image_dimensions(path).map_err(|e| ValidationError::ImageUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !fits_bounding_box(width, height, IMAGE_SIZE) {
        return Err(ValidationError::ImageConstraintViolated {
            path: path.to_path_buf(),
            width,
            height,
            bound: IMAGE_SIZE,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::write_image;
    use tempfile::tempdir;

    #[test]
    fn test_wide_image_with_full_width_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.png");
        write_image(&path, 512, 300);
        assert!(check_image(&path).is_ok());
    }

    #[test]
    fn test_square_image_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.png");
        write_image(&path, 512, 512);
        assert!(check_image(&path).is_ok());
    }

    #[test]
    fn test_tall_image_with_full_height_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.png");
        write_image(&path, 200, 512);
        assert!(check_image(&path).is_ok());
    }

    #[test]
    fn test_gif_and_webp_are_decoded() {
        let dir = tempdir().unwrap();
        for (name, width, height) in [("logo.gif", 512, 128), ("logo.webp", 64, 512)] {
            let path = dir.path().join(name);
            write_image(&path, width, height);
            assert!(check_image(&path).is_ok(), "{}", name);
        }

        let small = dir.path().join("small.webp");
        write_image(&small, 100, 100);
        assert_eq!(
            check_image(&small).unwrap_err().kind(),
            ErrorKind::ImageConstraintViolated
        );
    }

    #[test]
    fn test_oversized_image_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.png");
        write_image(&path, 600, 512);

        let err = check_image(&path).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ImageConstraintViolated {
                path: path.clone(),
                width: 600,
                height: 512,
                bound: 512,
            }
        );
    }

    #[test]
    fn test_small_image_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.png");
        write_image(&path, 256, 256);
        assert_eq!(
            check_image(&path).unwrap_err().kind(),
            ErrorKind::ImageConstraintViolated
        );
    }

    #[test]
    fn test_svg_is_not_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.svg");
        // Not even valid SVG; existence is all that matters.
        std::fs::write(&path, "<svg width=\"4000\" height=\"10\"").unwrap();
        assert!(check_image(&path).is_ok());

        let upper = dir.path().join("LOGO.SVG");
        std::fs::write(&upper, "").unwrap();
        assert!(check_image(&upper).is_ok());
    }

    #[test]
    fn test_missing_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.svg");
        assert_eq!(
            check_image(&path).unwrap_err(),
            ValidationError::ImageMissing { path }
        );
    }

    #[test]
    fn test_undecodable_raster() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert_eq!(
            check_image(&path).unwrap_err().kind(),
            ErrorKind::ImageUnreadable
        );
    }

    #[test]
    fn test_fits_bounding_box() {
        assert!(fits_bounding_box(512, 0, 512));
        assert!(!fits_bounding_box(513, 512, 512));
        assert!(!fits_bounding_box(511, 511, 512));
    }
}
