//! Texture fetch collaborator: request keys, notifications, and a coalescing
//! cache that turns fetched bytes into renderer handles.

use std::num::NonZeroU32;

use crate::HashMap;

/// Renderer-owned texture name. Zero is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(NonZeroU32);

impl TextureHandle {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Identifies who asked for a texture: an owner (e.g. one model) and a slot
/// within it (e.g. one mesh).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequesterId {
    pub owner: u64,
    pub slot: u32,
}

/// Caller-chosen tag echoed back in the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTag(pub u32);

/// Delivered once per registered request, after the texture has either
/// loaded (`handle` is `Some`) or failed (`None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureNotification {
    pub path: String,
    pub handle: Option<TextureHandle>,
    pub requester: RequesterId,
    pub tag: RequestTag,
}

pub trait TextureFetch {
    /// Registers interest in the texture at `path`. The answer arrives later
    /// as a [`TextureNotification`] carrying the same requester and tag.
    fn fetch_texture(&mut self, path: &str, requester: RequesterId, tag: RequestTag);
}

pub trait TextureCancel {
    /// Drops a pending request. A no-op once the notification was delivered.
    fn cancel_texture(&mut self, requester: RequesterId, tag: RequestTag);
}

/// Turns fetched image bytes into a renderer handle.
pub trait TextureUploader {
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Option<TextureHandle>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Fetching,
    Loaded(Option<TextureHandle>),
}

#[derive(Debug)]
struct Entry {
    state: EntryState,
    waiters: Vec<(RequesterId, RequestTag)>,
}

/// Coalesces texture requests by path.
///
/// The first request for a path queues one outbound fetch (see
/// [`take_outbound`](Self::take_outbound)); every further request for that
/// path just waits on the same result. Loaded results stay cached, so late
/// requests are answered without another fetch. Notifications are never
/// delivered from inside `fetch_texture`/`on_bytes`; the driver collects them
/// with [`drain_notifications`](Self::drain_notifications).
pub struct TextureCache<U: TextureUploader> {
    uploader: U,
    entries: HashMap<String, Entry>,
    outbound: Vec<String>,
    due: Vec<String>,
}

impl<U: TextureUploader> TextureCache<U> {
    pub fn new(uploader: U) -> Self {
        Self {
            uploader,
            entries: HashMap::default(),
            outbound: vec![],
            due: vec![],
        }
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn uploader_mut(&mut self) -> &mut U {
        &mut self.uploader
    }

    /// The cached handle for `path`, if it finished loading successfully.
    pub fn handle(&self, path: &str) -> Option<TextureHandle> {
        match self.entries.get(path)?.state {
            EntryState::Loaded(handle) => handle,
            EntryState::Fetching => None,
        }
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.entries
            .get(path)
            .is_some_and(|e| e.state == EntryState::Fetching)
    }

    /// Number of requests still waiting for delivery, over all paths.
    pub fn waiting(&self) -> usize {
        self.entries.values().map(|e| e.waiters.len()).sum()
    }

    /// Paths whose bytes need fetching, in request order. Each path is
    /// returned once.
    pub fn take_outbound(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbound)
    }

    /// Completes the fetch of `path`. `None` or empty bytes mean the fetch
    /// failed; waiters are then notified with no handle.
    pub fn on_bytes(
        &mut self,
        path: &str,
        bytes: Option<&[u8]>,
    ) -> Option<TextureHandle> {
        let Some(entry) = self.entries.get_mut(path) else {
            log::warn!("Stray texture data for {path}");
            return None;
        };
        if entry.state != EntryState::Fetching {
            log::warn!("Texture {path} was already loaded");
            return self.handle(path);
        }
        let handle = bytes
            .filter(|b| !b.is_empty())
            .and_then(|b| self.uploader.upload(path, b));
        if handle.is_none() {
            log::error!("Could not load texture {path}");
        }
        entry.state = EntryState::Loaded(handle);
        if !entry.waiters.is_empty() {
            self.due.push(path.to_owned());
        }
        handle
    }

    /// Hands out the notifications for every request whose texture has been
    /// resolved, in the order the textures resolved.
    pub fn drain_notifications(&mut self) -> Vec<TextureNotification> {
        let mut out = vec![];
        for path in std::mem::take(&mut self.due) {
            let Some(entry) = self.entries.get_mut(&path) else {
                continue;
            };
            let EntryState::Loaded(handle) = entry.state else {
                continue;
            };
            for (requester, tag) in entry.waiters.drain(..) {
                log::debug!("Delivering texture {path} to {requester:?}/{tag:?}");
                out.push(TextureNotification {
                    path: path.clone(),
                    handle,
                    requester,
                    tag,
                });
            }
        }
        out
    }
}

impl<U: TextureUploader> TextureFetch for TextureCache<U> {
    fn fetch_texture(&mut self, path: &str, requester: RequesterId, tag: RequestTag) {
        match self.entries.get_mut(path) {
            Some(entry) => {
                log::debug!("Texture {path} already requested, coalescing {requester:?}");
                if matches!(entry.state, EntryState::Loaded(_)) && entry.waiters.is_empty() {
                    self.due.push(path.to_owned());
                }
                entry.waiters.push((requester, tag));
            }
            None => {
                log::debug!("Requesting texture {path} for {requester:?}");
                self.entries.insert(
                    path.to_owned(),
                    Entry {
                        state: EntryState::Fetching,
                        waiters: vec![(requester, tag)],
                    },
                );
                self.outbound.push(path.to_owned());
            }
        }
    }
}

impl<U: TextureUploader> TextureCancel for TextureCache<U> {
    fn cancel_texture(&mut self, requester: RequesterId, tag: RequestTag) {
        for (path, entry) in self.entries.iter_mut() {
            if let Some(pos) = entry
                .waiters
                .iter()
                .position(|w| *w == (requester, tag))
            {
                log::debug!("Cancelled texture {path} for {requester:?}/{tag:?}");
                entry.waiters.remove(pos);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out sequential handles and counts uploads.
    #[derive(Default)]
    struct CountingUploader {
        uploads: Vec<String>,
    }

    impl TextureUploader for CountingUploader {
        fn upload(&mut self, path: &str, _bytes: &[u8]) -> Option<TextureHandle> {
            self.uploads.push(path.to_owned());
            TextureHandle::new(self.uploads.len() as u32)
        }
    }

    fn who(slot: u32) -> RequesterId {
        RequesterId { owner: 7, slot }
    }

    #[test]
    fn zero_is_not_a_handle() {
        assert!(TextureHandle::new(0).is_none());
        assert_eq!(TextureHandle::new(3).unwrap().get(), 3);
    }

    #[test]
    fn coalesces_requests_for_same_path() {
        let mut cache = TextureCache::new(CountingUploader::default());
        cache.fetch_texture("a.png", who(0), RequestTag(1));
        cache.fetch_texture("a.png", who(1), RequestTag(1));
        cache.fetch_texture("b.png", who(2), RequestTag(1));
        assert_eq!(cache.take_outbound(), vec!["a.png", "b.png"]);
        assert!(cache.take_outbound().is_empty());
        assert!(cache.drain_notifications().is_empty());

        let handle = cache.on_bytes("a.png", Some(b"png")).unwrap();
        let notes = cache.drain_notifications();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.handle == Some(handle) && n.path == "a.png"));
        assert_eq!(notes[0].requester, who(0));
        assert_eq!(notes[1].requester, who(1));
        assert_eq!(cache.uploader().uploads, vec!["a.png"]);
        assert!(cache.is_pending("b.png"));
        assert_eq!(cache.waiting(), 1);
    }

    #[test]
    fn late_request_is_served_from_cache() {
        let mut cache = TextureCache::new(CountingUploader::default());
        cache.fetch_texture("a.png", who(0), RequestTag(1));
        cache.take_outbound();
        cache.on_bytes("a.png", Some(b"png"));
        cache.drain_notifications();

        cache.fetch_texture("a.png", who(5), RequestTag(9));
        assert!(cache.take_outbound().is_empty());
        let notes = cache.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].tag, RequestTag(9));
        assert_eq!(notes[0].handle, cache.handle("a.png"));
        assert_eq!(cache.uploader().uploads.len(), 1);
    }

    #[test]
    fn failed_fetch_notifies_without_handle() {
        let mut cache = TextureCache::new(CountingUploader::default());
        cache.fetch_texture("gone.png", who(0), RequestTag(1));
        assert!(cache.on_bytes("gone.png", None).is_none());
        let notes = cache.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].handle.is_none());
        assert!(cache.uploader().uploads.is_empty());
    }

    #[test]
    fn cancel_before_and_after_delivery() {
        let mut cache = TextureCache::new(CountingUploader::default());
        cache.fetch_texture("a.png", who(0), RequestTag(1));
        cache.fetch_texture("a.png", who(1), RequestTag(1));
        cache.cancel_texture(who(0), RequestTag(1));
        // wrong tag leaves the request alone
        cache.cancel_texture(who(1), RequestTag(2));
        cache.on_bytes("a.png", Some(b"png"));
        let notes = cache.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].requester, who(1));

        cache.cancel_texture(who(1), RequestTag(1));
        assert!(cache.drain_notifications().is_empty());
        assert!(cache.handle("a.png").is_some());
    }
}
