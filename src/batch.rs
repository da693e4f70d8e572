//! Resolves many image slots of one form at once (e.g. every location of a
//! setting). Slots are independent: one failing never touches another.

use derive_debug::Dbg;
use futures::future::join_all;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    candidate::{CandidateImage, EntityKind},
    config::ValidationConfig,
    fallback::generate_fallback_url,
    resolve::{ImageSource, ResolveError, ResolvedImage, UploadIntent, UploadResolver, authoritative_url},
    storage,
};

#[derive(Dbg, Default)]
pub struct Slot {
    pub candidate: Option<CandidateImage>,
    pub existing_url: Option<String>,
}

/// Slots of one batch run, keyed by position in the form and kept in index
/// order.
///
/// Built fresh for every run, so a slot count that changed since the last run
/// cannot leave stale entries behind. Only the indices the caller named are
/// stored, however far apart they are.
#[derive(Dbg, Default)]
pub struct BatchSlots {
    slots: IndexMap<usize, Slot>,
}

impl BatchSlots {
    pub fn from_maps(
        candidates: IndexMap<usize, Option<CandidateImage>>,
        existing_urls: IndexMap<usize, String>,
    ) -> Self {
        let mut slots = IndexMap::<usize, Slot>::new();
        for (index, candidate) in candidates {
            slots.entry(index).or_default().candidate = candidate;
        }
        for (index, url) in existing_urls {
            slots.entry(index).or_default().existing_url = Some(url);
        }
        slots.sort_keys();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn into_indexed(self) -> impl Iterator<Item = (usize, Slot)> {
        self.slots.into_iter()
    }
}

impl FromIterator<(usize, Slot)> for BatchSlots {
    fn from_iter<T: IntoIterator<Item = (usize, Slot)>>(iter: T) -> Self {
        let mut slots = iter.into_iter().collect::<IndexMap<_, _>>();
        slots.sort_keys();
        Self { slots }
    }
}

pub struct BatchOptions<'a> {
    pub kind: EntityKind,
    pub preserve_existing: bool,
    /// Display name for a slot, used to seed its fallback image.
    pub name_for: &'a (dyn Fn(usize) -> String + Sync),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SlotOutcome {
    pub url: String,
    pub source: ImageSource,
    pub error: Option<ResolveError>,
}

pub struct BatchUploadCoordinator<'a, S> {
    resolver: UploadResolver<'a, S>,
}

impl<'a, S: storage::Client> BatchUploadCoordinator<'a, S> {
    pub fn new(config: &'a ValidationConfig, storage: &'a S) -> Self {
        Self {
            resolver: UploadResolver::new(config, storage),
        }
    }

    async fn resolve_slot(&self, index: usize, slot: Slot, options: &BatchOptions<'_>) -> SlotOutcome {
        let existing_url = slot.existing_url.clone();
        let resolved = self
            .resolver
            .resolve(UploadIntent {
                candidate: slot.candidate,
                kind: options.kind,
                existing_url: slot.existing_url,
                preserve_existing: options.preserve_existing,
            })
            .await;
        match resolved {
            ResolvedImage::Ready { url, source } => SlotOutcome {
                url,
                source,
                error: None,
            },
            ResolvedImage::Failed(error) => {
                let fallback = generate_fallback_url(
                    &self.resolver.config().fallback_base_url,
                    &(options.name_for)(index),
                    options.kind,
                    Some(index),
                );
                let (url, source) =
                    authoritative_url(None, existing_url.as_deref(), Some(&fallback));
                warn!(slot = index, %error, ?source, "slot failed, substituting previous image");
                SlotOutcome {
                    url,
                    source,
                    error: Some(error),
                }
            }
        }
    }

    /// Resolves every slot concurrently and reports how each one ended.
    pub async fn resolve_all_detailed(
        &self,
        slots: BatchSlots,
        options: &BatchOptions<'_>,
    ) -> IndexMap<usize, SlotOutcome> {
        debug!(slots = slots.len(), kind = %options.kind, "resolving batch");
        let tasks = slots.into_indexed().map(|(index, slot)| async move {
            (index, self.resolve_slot(index, slot, options).await)
        });
        join_all(tasks).await.into_iter().collect()
    }

    pub async fn resolve_all(
        &self,
        slots: BatchSlots,
        options: &BatchOptions<'_>,
    ) -> IndexMap<usize, String> {
        self.resolve_all_detailed(slots, options)
            .await
            .into_iter()
            .map(|(index, outcome)| (index, outcome.url))
            .collect()
    }
}
