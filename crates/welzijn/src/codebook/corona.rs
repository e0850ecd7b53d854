//! Built-in codebook for the Corona & Welzijn survey, waves 1 and 2.

use super::{Codebook, CodebookEntry, ItemTemplate, Level, RatioRule, VariableSpec, levels};
use crate::scoring::ScaleDefinition;

/// Waves covered by the built-in codebook, with the fieldwork year used as
/// reference for age.
const WAVES: &[(u32, i32)] = &[(1, 2020), (2, 2021)];

const CORSTRESS_ITEMS: u32 = 5;
const EENZAAM_ITEMS: u32 = 3;

fn gender() -> Vec<Level> {
    levels(&[(1, "Man"), (2, "Vrouw"), (3, "Anders")])
}

fn education() -> Vec<Level> {
    levels(&[
        (1, "Geen/basisonderwijs"),
        (2, "VMBO/MAVO"),
        (3, "HAVO/VWO/MBO"),
        (4, "HBO"),
        (5, "WO"),
    ])
}

fn work() -> Vec<Level> {
    levels(&[
        (1, "Werkend"),
        (2, "Werkzoekend"),
        (3, "Student"),
        (4, "Gepensioneerd"),
        (5, "Anders"),
    ])
}

fn household() -> Vec<Level> {
    levels(&[
        (1, "Alleenwonend"),
        (2, "Met partner"),
        (3, "Met partner en kinderen"),
        (4, "Alleenstaande ouder"),
        (5, "Bij ouders"),
        (6, "Anders"),
    ])
}

fn health() -> Vec<Level> {
    levels(&[
        (1, "Slecht"),
        (2, "Matig"),
        (3, "Goed"),
        (4, "Zeer goed"),
        (5, "Uitstekend"),
    ])
}

fn agreement() -> Vec<Level> {
    levels(&[
        (1, "Helemaal mee oneens"),
        (2, "Mee oneens"),
        (3, "Neutraal"),
        (4, "Mee eens"),
        (5, "Helemaal mee eens"),
    ])
}

fn frequency() -> Vec<Level> {
    levels(&[(1, "Nooit"), (2, "Soms"), (3, "Vaak")])
}

fn wave_variables(wave: u32, reference_year: i32) -> Vec<VariableSpec> {
    let w = |name: &str| format!("W{}_{}", wave, name);
    vec![
        CodebookEntry::nominal(w("Geslacht"), gender()).into(),
        CodebookEntry::ratio(
            w("Geboortejaar"),
            w("Leeftijd"),
            RatioRule::years_since(reference_year).within(1900.0, f64::from(reference_year - 16)),
        )
        .into(),
        CodebookEntry::ordinal(w("Opleiding"), education()).into(),
        CodebookEntry::nominal(w("Werksituatie"), work()).into(),
        CodebookEntry::nominal(w("Woonsituatie"), household()).into(),
        CodebookEntry::ordinal(w("Gezondheid"), health()).into(),
        ItemTemplate::new(w("Corstress"), 1, CORSTRESS_ITEMS, agreement()).into(),
        ItemTemplate::new(w("Eenzaam"), 1, EENZAAM_ITEMS, frequency()).into(),
    ]
}

fn wave_scales(wave: u32) -> Vec<ScaleDefinition> {
    let items = |stem: &str, n: u32| -> Vec<String> {
        (1..=n).map(|i| format!("W{}_{}{}", wave, stem, i)).collect()
    };
    vec![
        ScaleDefinition::new(format!("W{}_Corstress_Gem", wave), items("Corstress", CORSTRESS_ITEMS)),
        ScaleDefinition::new(format!("W{}_Eenzaam_Gem", wave), items("Eenzaam", EENZAAM_ITEMS)),
    ]
}

pub(super) fn codebook() -> Codebook {
    let variables = WAVES
        .iter()
        .flat_map(|&(wave, year)| wave_variables(wave, year))
        .collect();
    let scales = WAVES.iter().flat_map(|&(wave, _)| wave_scales(wave)).collect();
    Codebook::new("Corona & Welzijn", variables, scales)
        .expect("built-in Corona & Welzijn codebook is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::VariableKind;

    #[test]
    fn test_builtin_codebook_is_valid() {
        let codebook = codebook();
        // 6 single variables + 5 + 3 items, per wave
        assert_eq!(codebook.len(), 2 * (6 + CORSTRESS_ITEMS + EENZAAM_ITEMS) as usize);
        assert_eq!(codebook.scales().len(), 4);
    }

    #[test]
    fn test_age_uses_wave_reference_year() {
        let codebook = codebook();
        let w1 = codebook.entry("W1_Geboortejaar").unwrap();
        let w2 = codebook.entry("W2_Geboortejaar").unwrap();
        assert_eq!(w1.kind, VariableKind::Ratio);
        assert_eq!(w1.derived_name, "W1_Leeftijd");
        assert_eq!(w1.ratio.as_ref().unwrap().apply(1970.0), Some(50.0));
        assert_eq!(w2.ratio.as_ref().unwrap().apply(1970.0), Some(51.0));
    }

    #[test]
    fn test_both_waves_share_level_maps() {
        let codebook = codebook();
        for entry in codebook.entries().iter().filter(|e| e.raw_name.starts_with("W1_")) {
            let twin = codebook.entry(&entry.raw_name.replacen("W1_", "W2_", 1)).unwrap();
            assert_eq!(entry.levels, twin.levels);
            assert_eq!(entry.kind, twin.kind);
        }
    }
}
