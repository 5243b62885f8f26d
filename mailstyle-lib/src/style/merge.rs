//! Combining declaration maps under `!important` rules and rendering the
//! result as `style` attribute text.

use crate::style::declarations::{strip_important_marker, Declaration, DeclarationMap};

/// Renders declarations as `prop: value; prop: value;`.
pub fn render_declarations<'a>(declarations: impl IntoIterator<Item = &'a Declaration>) -> String {
    declarations
        .into_iter()
        .map(Declaration::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Merges `incoming` over `existing`.
///
/// For a property present in both, an important existing value survives a
/// non-important incoming one and keeps its position. In every other case
/// the existing entry is dropped and the incoming one is emitted in its
/// own position, after all remaining existing entries.
pub fn merge_declarations(existing: &DeclarationMap, incoming: &DeclarationMap) -> String {
    let existing_wins =
        |old: &Declaration, new: &Declaration| old.important && !new.important;

    let kept_existing = existing.iter().filter(|old| {
        incoming
            .get(&old.property)
            .map_or(true, |new| existing_wins(*old, new))
    });
    let kept_incoming = incoming.iter().filter(|new| {
        existing
            .get(&new.property)
            .map_or(true, |old| !existing_wins(old, *new))
    });
    render_declarations(kept_existing.chain(kept_incoming))
}

/// Moves important declarations after the regular ones and removes their
/// `!important` marker. Within each group the order is kept.
pub fn strip_important(declarations: &DeclarationMap) -> String {
    let (important, regular): (Vec<&Declaration>, Vec<&Declaration>) =
        declarations.iter().partition(|d| d.important);
    let unmarked: Vec<Declaration> = important
        .into_iter()
        .map(|d| Declaration::new(&d.property, strip_important_marker(&d.value)))
        .collect();
    render_declarations(regular.into_iter().chain(unmarked.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::declarations::parse_declarations_block as parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn incoming_overrides_and_moves_to_the_end() {
        assert_eq!(
            merge_declarations(
                &parse("color: red; margin: 0"),
                &parse("color: blue; padding: 1px"),
            ),
            "margin: 0; color: blue; padding: 1px;"
        );
    }

    #[test]
    fn important_existing_beats_regular_incoming() {
        assert_eq!(
            merge_declarations(&parse("color: red !important; margin: 0"), &parse("color: blue")),
            "color: red !important; margin: 0;"
        );
    }

    #[test]
    fn later_important_beats_earlier_important() {
        assert_eq!(
            merge_declarations(&parse("color: red !important"), &parse("color: blue !important")),
            "color: blue !important;"
        );
        assert_eq!(
            merge_declarations(&parse("color: red"), &parse("color: blue !important")),
            "color: blue !important;"
        );
    }

    #[test]
    fn merging_with_empty_maps() {
        assert_eq!(merge_declarations(&parse(""), &parse("COLOR:  red ")), "color: red;");
        assert_eq!(merge_declarations(&parse("margin: 0"), &parse("")), "margin: 0;");
        assert_eq!(merge_declarations(&parse(""), &parse("")), "");
    }

    #[test]
    fn strips_and_reorders_important_declarations() {
        assert_eq!(
            strip_important(&parse(
                "color: red !important; margin: 0; padding: 1px ! IMPORTANT; border: none"
            )),
            "margin: 0; border: none; color: red; padding: 1px;"
        );
    }
}
