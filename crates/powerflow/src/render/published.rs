use tokio::sync::watch;

use super::Document;
use super::Element;
use super::Surface;

/// A document that publishes a snapshot of itself every time it is presented.
///
/// The synchronizer owns the document and mutates it without locking; readers
/// (the display API) only ever see whole presented snapshots.
pub struct PublishedDocument {
    document: Document,
    tx: watch::Sender<Document>,
}

impl PublishedDocument {
    pub fn new(document: Document) -> (Self, watch::Receiver<Document>) {
        let (tx, rx) = watch::channel(document.clone());
        (Self { document, tx }, rx)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn subscribe(&self) -> watch::Receiver<Document> {
        self.tx.subscribe()
    }
}

impl Surface for PublishedDocument {
    fn query_selector(&mut self, selector: &str) -> Option<&mut dyn Element> {
        self.document.query_selector(selector)
    }

    fn present(&mut self) {
        self.tx.send_replace(self.document.clone());
    }
}
