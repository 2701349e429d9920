//! Displayable previews derived from the selected image.

use shared::domain::SelectionId;

use crate::api::ImageUpload;

/// Creates and releases the preview resource shown next to a pending image.
///
/// The controller releases every handle it created exactly once: when the
/// selection is replaced, cleared, or the user logs out.
pub trait PreviewSurface {
    type Handle;

    /// `None` when no preview can be derived; the image is still submitted.
    fn create(&mut self, selection: SelectionId, image: &ImageUpload) -> Option<Self::Handle>;

    fn release(&mut self, handle: Self::Handle);
}

/// For clients with nothing to display.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreview;

impl PreviewSurface for NoPreview {
    type Handle = ();

    fn create(&mut self, _selection: SelectionId, _image: &ImageUpload) -> Option<()> {
        None
    }

    fn release(&mut self, _handle: ()) {}
}
