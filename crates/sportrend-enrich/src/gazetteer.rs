//! Known sports names and the context words that introduce unknown ones.
//!
//! Names are written in their usual spelling and canonicalized on first use,
//! so they match normalized text regardless of hamza or teh marbuta spelling.

use std::sync::LazyLock;

use sportrend_core::text::{canonicalize, tokenize};
use sportrend_core::EntityType;

/// `(type, display name, aliases)`. The display name is always an alias too.
static ENTRIES: &[(EntityType, &str, &[&str])] = &[
    (EntityType::Player, "محمد صلاح", &["صلاح", "مو صلاح"]),
    (EntityType::Player, "ليونيل ميسي", &["ميسي", "ليو ميسي"]),
    (EntityType::Player, "كريستيانو رونالدو", &["رونالدو", "كريستيانو"]),
    (EntityType::Player, "كريم بنزيما", &["بنزيما"]),
    (EntityType::Player, "نيمار", &["نيمار جونيور"]),
    (EntityType::Player, "كيليان مبابي", &["مبابي"]),
    (EntityType::Player, "روبرت ليفاندوفسكي", &["ليفاندوفسكي"]),
    (EntityType::Player, "هاري كين", &[]),
    (EntityType::Player, "إرلينغ هالاند", &["هالاند"]),
    (EntityType::Player, "رياض محرز", &["محرز"]),
    (EntityType::Player, "ساديو ماني", &["ماني"]),
    (EntityType::Player, "كيفن دي بروين", &["دي بروين"]),
    (EntityType::Player, "سالم الدوسري", &["الدوسري"]),
    (EntityType::Player, "ياسين بونو", &["بونو"]),
    (EntityType::Team, "الهلال", &["نادي الهلال"]),
    (EntityType::Team, "النصر", &["نادي النصر"]),
    (EntityType::Team, "الأهلي", &["نادي الأهلي"]),
    (EntityType::Team, "الاتحاد", &["نادي الاتحاد"]),
    (EntityType::Team, "ريال مدريد", &["الريال"]),
    (EntityType::Team, "برشلونة", &["البارسا"]),
    (EntityType::Team, "منتخب مصر", &[]),
    (EntityType::Team, "منتخب السعودية", &["المنتخب السعودي"]),
    (EntityType::Team, "منتخب المغرب", &["المنتخب المغربي"]),
    (EntityType::Team, "مانشستر يونايتد", &[]),
    (EntityType::Team, "مانشستر سيتي", &[]),
    (EntityType::Team, "ليفربول", &[]),
    (EntityType::Team, "يوفنتوس", &[]),
    (EntityType::Team, "بايرن ميونخ", &[]),
    (EntityType::Team, "باريس سان جيرمان", &[]),
    (EntityType::Team, "تشيلسي", &[]),
    (EntityType::Team, "أرسنال", &[]),
    (EntityType::Competition, "كأس العالم", &["المونديال", "مونديال"]),
    (EntityType::Competition, "دوري أبطال أوروبا", &["الشامبيونزليغ"]),
    (EntityType::Competition, "الدوري السعودي", &["دوري روشن"]),
    (EntityType::Competition, "الدوري الإسباني", &["الليغا"]),
    (EntityType::Competition, "الدوري الإنجليزي", &["البريميرليغ"]),
    (EntityType::Competition, "كأس أمم إفريقيا", &[]),
    (EntityType::Competition, "كأس آسيا", &[]),
    (EntityType::Competition, "كأس الخليج", &[]),
    (EntityType::Competition, "دوري أبطال آسيا", &[]),
    (EntityType::Competition, "كأس العالم للأندية", &[]),
    (EntityType::Competition, "ويمبلدون", &[]),
    (EntityType::Competition, "أولمبياد", &["الأولمبياد"]),
];

/// Words that announce an entity of a type in the next word.
///
/// Team and competition prefixes are part of the name ("منتخب تونس"),
/// player prefixes are not ("هداف فلان" names "فلان").
const CONTEXT_WORDS: &[(EntityType, &str, bool)] = &[
    (EntityType::Player, "لاعب", false),
    (EntityType::Player, "نجم", false),
    (EntityType::Player, "هداف", false),
    (EntityType::Player, "المهاجم", false),
    (EntityType::Player, "الحارس", false),
    (EntityType::Team, "فريق", true),
    (EntityType::Team, "نادي", true),
    (EntityType::Team, "منتخب", true),
    (EntityType::Competition, "بطولة", true),
    (EntityType::Competition, "كأس", true),
    (EntityType::Competition, "دوري", true),
];

#[derive(Debug)]
pub(crate) struct Alias {
    pub(crate) tokens: Vec<String>,
    pub(crate) entity_type: EntityType,
    /// Canonical display name reported as the entity text.
    pub(crate) name: String,
}

#[derive(Debug)]
pub(crate) struct ContextWord {
    pub(crate) token: String,
    pub(crate) entity_type: EntityType,
    pub(crate) include_prefix: bool,
}

/// Every alias, longest token sequence first.
pub(crate) static ALIASES: LazyLock<Vec<Alias>> = LazyLock::new(|| {
    let mut aliases: Vec<Alias> = ENTRIES
        .iter()
        .flat_map(|(entity_type, name, extra)| {
            let name = canonicalize(name);
            std::iter::once(name.clone())
                .chain(extra.iter().map(|a| canonicalize(a)))
                .map(move |alias| Alias {
                    tokens: tokenize(&alias),
                    entity_type: *entity_type,
                    name: name.clone(),
                })
        })
        .collect();
    aliases.sort_by(|a, b| b.tokens.len().cmp(&a.tokens.len()));
    aliases
});

pub(crate) static CONTEXT: LazyLock<Vec<ContextWord>> = LazyLock::new(|| {
    CONTEXT_WORDS
        .iter()
        .map(|(entity_type, word, include_prefix)| ContextWord {
            token: canonicalize(word),
            entity_type: *entity_type,
            include_prefix: *include_prefix,
        })
        .collect()
});

pub(crate) fn context_word(token: &str) -> Option<&'static ContextWord> {
    CONTEXT.iter().find(|c| c.token == token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_canonical_and_longest_first() {
        assert!(ALIASES
            .windows(2)
            .all(|w| w[0].tokens.len() >= w[1].tokens.len()));
        let ahli = ALIASES
            .iter()
            .find(|a| a.tokens == ["الاهلي"])
            .expect("al-ahli alias");
        assert_eq!(ahli.name, "الاهلي");
        assert_eq!(ahli.entity_type, EntityType::Team);
    }

    #[test]
    fn aliases_report_display_name() {
        let salah = ALIASES
            .iter()
            .find(|a| a.tokens == ["صلاح"])
            .expect("salah alias");
        assert_eq!(salah.name, "محمد صلاح");
    }
}
