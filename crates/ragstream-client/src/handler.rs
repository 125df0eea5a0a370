use crate::types::Source;

/// Receives decoded events while a stream session runs.
///
/// Callbacks fire in the order their records appear on the wire, before the
/// stream finishes. `on_images` defaults to a no-op, so a handler that does
/// not override it simply never sees image records.
pub trait StreamHandler {
    /// An incremental fragment of the answer text
    fn on_chunk(&mut self, content: String);

    /// Cited sources, in server order
    fn on_final(&mut self, sources: Vec<Source>);

    /// Referenced image paths
    fn on_images(&mut self, _paths: Vec<String>) {}
}

impl<H: StreamHandler + ?Sized> StreamHandler for &mut H {
    fn on_chunk(&mut self, content: String) {
        (**self).on_chunk(content)
    }

    fn on_final(&mut self, sources: Vec<Source>) {
        (**self).on_final(sources)
    }

    fn on_images(&mut self, paths: Vec<String>) {
        (**self).on_images(paths)
    }
}

/// Closure-backed handler.
///
/// ```
/// use ragstream_client::FnHandler;
///
/// let mut answer = String::new();
/// let handler = FnHandler::new(|chunk| answer.push_str(&chunk), |_sources| {});
/// # drop(handler);
/// ```
pub struct FnHandler<C, F, I = fn(Vec<String>)> {
    on_chunk: C,
    on_final: F,
    on_images: Option<I>,
}

impl<C, F> FnHandler<C, F>
where
    C: FnMut(String),
    F: FnMut(Vec<Source>),
{
    pub fn new(on_chunk: C, on_final: F) -> Self {
        Self {
            on_chunk,
            on_final,
            on_images: None,
        }
    }
}

impl<C, F, I> FnHandler<C, F, I> {
    /// Install an images callback
    pub fn with_images<J>(self, on_images: J) -> FnHandler<C, F, J>
    where
        J: FnMut(Vec<String>),
    {
        FnHandler {
            on_chunk: self.on_chunk,
            on_final: self.on_final,
            on_images: Some(on_images),
        }
    }
}

impl<C, F, I> StreamHandler for FnHandler<C, F, I>
where
    C: FnMut(String),
    F: FnMut(Vec<Source>),
    I: FnMut(Vec<String>),
{
    fn on_chunk(&mut self, content: String) {
        (self.on_chunk)(content)
    }

    fn on_final(&mut self, sources: Vec<Source>) {
        (self.on_final)(sources)
    }

    fn on_images(&mut self, paths: Vec<String>) {
        match self.on_images.as_mut() {
            Some(on_images) => on_images(paths),
            None => tracing::trace!(count = paths.len(), "No images handler, dropping image record"),
        }
    }
}
