use crate::utils::error::{FinderError, Result};

pub const ALL_SPECIALTIES: [&str; 13] = [
    "Urologists",
    "Cardiologists",
    "Diabetologists",
    "Neurologists",
    "Dermatologists",
    "Gastroenterologists",
    "Oncologists",
    "Orthopedic Surgeons",
    "Pediatricians",
    "Psychiatrists",
    "Radiologists",
    "Ophthalmologists",
    "Endocrinologists",
];

pub const DEFAULT_SPECIALTIES: [&str; 3] = ["Urologists", "Cardiologists", "Diabetologists"];

/// 在目錄中找對應的標準名稱（不分大小寫）
pub fn lookup(label: &str) -> Option<&'static str> {
    let wanted = label.trim();
    ALL_SPECIALTIES
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(wanted))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialtySelection {
    selected: Vec<&'static str>,
}

impl Default for SpecialtySelection {
    fn default() -> Self {
        Self {
            selected: DEFAULT_SPECIALTIES.to_vec(),
        }
    }
}

impl SpecialtySelection {
    pub fn empty() -> Self {
        Self {
            selected: Vec::new(),
        }
    }

    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::empty();
        for label in labels {
            let label = label.as_ref();
            let known = lookup(label).ok_or_else(|| {
                FinderError::validation(format!(
                    "Unknown specialty '{}'. Available: {}",
                    label,
                    ALL_SPECIALTIES.join(", ")
                ))
            })?;
            if !selection.contains(known) {
                selection.selected.push(known);
            }
        }
        Ok(selection)
    }

    pub fn toggle(&mut self, label: &str) -> Result<()> {
        let known = lookup(label)
            .ok_or_else(|| FinderError::validation(format!("Unknown specialty '{}'", label)))?;
        if let Some(pos) = self.selected.iter().position(|s| *s == known) {
            self.selected.remove(pos);
        } else {
            self.selected.push(known);
        }
        Ok(())
    }

    pub fn contains(&self, label: &str) -> bool {
        lookup(label).is_some_and(|known| self.selected.contains(&known))
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.selected.iter().map(|s| s.to_string()).collect()
    }

    pub fn summary(&self) -> String {
        match self.selected.len() {
            0 => "Select specialties".to_string(),
            1 => "1 specialty selected".to_string(),
            n => format!("{} specialties selected", n),
        }
    }
}
