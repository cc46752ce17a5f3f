use crate::error::CatalogError;
use crate::models::{Category, CategoryRaw, Language};

/// Zips two single-language category listings into bilingual categories.
///
/// The listings are index-aligned: the same logical category sits at the same
/// position in both, so the merge goes by position rather than by id. Id and
/// count come from the primary listing. A blank secondary name falls back to
/// the primary one. Listings of different length are rejected instead of
/// truncated.
pub fn merge_categories(
    primary: Vec<CategoryRaw>,
    secondary: Vec<CategoryRaw>,
) -> Result<Vec<Category>, CatalogError> {
    if primary.len() != secondary.len() {
        return Err(CatalogError::Consistency {
            primary: primary.len(),
            secondary: secondary.len(),
            primary_lang: Language::Zh,
            secondary_lang: Language::En,
        });
    }

    Ok(primary
        .into_iter()
        .zip(secondary)
        .map(|(zh, en)| {
            let name_en = if en.name.trim().is_empty() {
                zh.name.clone()
            } else {
                en.name
            };
            Category {
                id: zh.id,
                name_zh: zh.name,
                name_en,
                count: zh.count,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, name: &str, count: u32) -> CategoryRaw {
        CategoryRaw {
            id: id.to_string(),
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn names_are_taken_positionally() {
        let zh = vec![raw("portrait", "肖像", 5), raw("logo", "标志", 3)];
        // The secondary listing echoes different ids; position still wins.
        let en = vec![raw("a", "Portrait", 5), raw("b", "Logo", 3)];

        let merged = merge_categories(zh, en).expect("aligned listings");
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "portrait");
        assert_eq!(merged[0].name_zh, "肖像");
        assert_eq!(merged[0].name_en, "Portrait");
        assert_eq!(merged[1].name(Language::En), "Logo");
        assert_eq!(merged[1].count, 3);
    }

    #[test]
    fn blank_secondary_name_falls_back_to_primary() {
        let merged =
            merge_categories(vec![raw("3d", "3D", 1)], vec![raw("3d", " ", 1)]).expect("merge");
        assert_eq!(merged[0].name_en, "3D");
    }

    #[test]
    fn length_mismatch_is_a_consistency_error() {
        let err = merge_categories(
            vec![raw("1", "一", 1), raw("2", "二", 1)],
            vec![raw("1", "one", 1)],
        )
        .expect_err("mismatch must not truncate");
        assert!(matches!(
            err,
            CatalogError::Consistency {
                primary: 2,
                secondary: 1,
                ..
            }
        ));
    }

    #[test]
    fn empty_listings_merge_to_nothing() {
        assert!(merge_categories(Vec::new(), Vec::new()).expect("merge").is_empty());
    }
}
