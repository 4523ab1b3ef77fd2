//! crates/course_highlights_core/src/view.rs
//!
//! The per-field highlight cache owned by whatever renders a field.
//!
//! The cache only ever reflects confirmed store state: it is filled from the
//! store on `load`, appended after a create succeeds and pruned after a
//! delete succeeds. A failed round trip leaves it untouched.

use uuid::Uuid;

use crate::compositor::{composite, Segments};
use crate::domain::{FieldKey, Highlight, NewHighlight};
use crate::offsets::{resolve, RenderedField, Selection};
use crate::ports::{HighlightStore, PortResult};

pub struct HighlightView<S> {
    store: S,
    owner_id: Uuid,
    course_id: Uuid,
    field: FieldKey,
    text: String,
    highlights: Vec<Highlight>,
}

impl<S: HighlightStore> HighlightView<S> {
    /// Creates an empty view over `text`. Call [`HighlightView::load`] to fill it.
    pub fn new(store: S, owner_id: Uuid, course_id: Uuid, field: FieldKey, text: impl Into<String>) -> Self {
        Self {
            store,
            owner_id,
            course_id,
            field,
            text: text.into(),
            highlights: Vec::new(),
        }
    }

    pub fn field(&self) -> FieldKey {
        self.field
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    /// Replaces the cache with the owner's stored highlights for this field.
    pub async fn load(&mut self) -> PortResult<()> {
        let all = self
            .store
            .list_highlights(self.owner_id, self.course_id)
            .await?;
        self.highlights = all.into_iter().filter(|h| h.field == self.field).collect();
        Ok(())
    }

    /// Turns a selection on `rendered` into a stored highlight.
    ///
    /// Blank selections and selections outside the field are skipped with `Ok(None)`.
    pub async fn select(
        &mut self,
        rendered: &RenderedField,
        selection: &Selection,
        color: Option<String>,
    ) -> PortResult<Option<Highlight>> {
        let Some(range) = resolve(rendered, selection) else {
            return Ok(None);
        };

        let created = self
            .store
            .create_highlight(NewHighlight {
                owner_id: self.owner_id,
                course_id: self.course_id,
                field: self.field,
                text: range.text,
                start_offset: range.start_offset,
                end_offset: range.end_offset,
                color,
            })
            .await?;

        self.highlights.push(created.clone());
        Ok(Some(created))
    }

    /// Deletes a highlight and drops it from the cache once the store confirms.
    pub async fn remove(&mut self, id: Uuid) -> PortResult<()> {
        self.store.delete_highlight(id, self.owner_id).await?;
        self.highlights.retain(|h| h.id != id);
        Ok(())
    }

    pub fn segments(&self) -> Segments<'_> {
        composite(&self.text, &self.highlights)
    }

    /// The node layout the field currently renders with.
    pub fn rendered(&self) -> RenderedField {
        RenderedField::from_segments(self.segments())
    }
}
