use std::path::Path;

use image::{DynamicImage, RgbImage};
use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use folio_core::{PageRect, PageSize};

use crate::document::{set_page_kids, LopdfDocument};
use crate::PdfError;

/// Resource name every image page draws its picture under.
const IMAGE_NAME: &[u8] = b"Im0";

/// Page boxes that would no longer fit a replaced page.
const STALE_BOXES: [&[u8]; 3] = [b"TrimBox", b"BleedBox", b"ArtBox"];

/// Add an uncompressed RGB image XObject; `compress` deflates it on save.
fn add_image_xobject(doc: &mut Document, image: &RgbImage) -> ObjectId {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width() as i64,
        "Height" => image.height() as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    doc.add_object(Stream::new(dict, image.as_raw().clone()))
}

fn draw_image(x: f32, y: f32, width: f32, height: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                y.into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn white_fill(width: f32, height: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![1.into(), 1.into(), 1.into()]),
        Operation::new(
            "re",
            vec![0.into(), 0.into(), width.into(), height.into()],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

fn media_box(size: PageSize) -> Vec<Object> {
    vec![0.into(), 0.into(), size.width.into(), size.height.into()]
}

fn image_resources(xobject: ObjectId) -> lopdf::Dictionary {
    dictionary! {
        "XObject" => dictionary! {
            "Im0" => xobject,
        },
    }
}

/// Replace a page's content with a single image.
///
/// The page becomes `canvas` points large with no rotation, filled white,
/// with `image` stretched over `content` (measured from the top-left
/// corner). The old content streams and resources are dropped.
pub(crate) fn replace_with_image(
    doc: &mut Document,
    page_id: ObjectId,
    canvas: PageSize,
    content: PageRect,
    image: &RgbImage,
) -> Result<(), PdfError> {
    let xobject = add_image_xobject(doc, image);

    let mut operations = white_fill(canvas.width, canvas.height);
    operations.extend(draw_image(
        content.x,
        canvas.height - content.y - content.height,
        content.width,
        content.height,
    ));
    let stream = Content { operations }.encode()?;
    let contents = doc.add_object(Stream::new(lopdf::Dictionary::new(), stream));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("MediaBox", media_box(canvas));
    page.set("CropBox", media_box(canvas));
    for key in STALE_BOXES {
        page.remove(key);
    }
    page.set("Rotate", 0);
    page.set("Resources", image_resources(xobject));
    page.set("Contents", contents);

    debug!(
        "replaced page {:?} with a {}x{} image on a {}x{} canvas",
        page_id,
        image.width(),
        image.height(),
        canvas.width,
        canvas.height
    );
    Ok(())
}

impl LopdfDocument {
    /// Append a page showing `image`, one point per pixel.
    ///
    /// Returns the index of the new page.
    pub fn append_image_page(&mut self, image: &DynamicImage) -> Result<usize, PdfError> {
        let rgb = image.to_rgb8();
        let size = PageSize::new(rgb.width() as f32, rgb.height() as f32);

        let doc = self.raw_doc_mut();
        let xobject = add_image_xobject(doc, &rgb);
        let stream = Content {
            operations: draw_image(0.0, 0.0, size.width, size.height),
        }
        .encode()?;
        let contents = doc.add_object(Stream::new(lopdf::Dictionary::new(), stream));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => media_box(size),
            "Resources" => image_resources(xobject),
            "Contents" => contents,
        });

        let mut kids = self.page_ids();
        kids.push(page_id);
        set_page_kids(self.raw_doc_mut(), &kids)?;
        Ok(kids.len() - 1)
    }

    /// Decode an image file and append it as a new page.
    pub fn append_image_file(&mut self, path: impl AsRef<Path>) -> Result<usize, PdfError> {
        let path = path.as_ref();
        let image = image::open(path)?;
        let page = self.append_image_page(&image)?;
        debug!("added {} as page {}", path.display(), page + 1);
        Ok(page)
    }
}

/// File extensions accepted by [`LopdfDocument::append_image_file`].
pub const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"];

/// Whether `path` looks like an image the document can take as a page.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}
