/// The preset looks a portrait can be restyled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProfessionalStyle {
    #[default]
    MaleSuit,
    FemaleSuit,
    SmartCasual,
    MinimalWhite,
    ModernGray,
}

impl ProfessionalStyle {
    /// Catalog order; the first entry is the session default.
    pub const ALL: [ProfessionalStyle; 5] = [
        ProfessionalStyle::MaleSuit,
        ProfessionalStyle::FemaleSuit,
        ProfessionalStyle::SmartCasual,
        ProfessionalStyle::MinimalWhite,
        ProfessionalStyle::ModernGray,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ProfessionalStyle::MaleSuit => "MALE_SUIT",
            ProfessionalStyle::FemaleSuit => "FEMALE_SUIT",
            ProfessionalStyle::SmartCasual => "SMART_CASUAL",
            ProfessionalStyle::MinimalWhite => "MINIMAL_WHITE",
            ProfessionalStyle::ModernGray => "MODERN_GRAY",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ProfessionalStyle::MaleSuit => "Business suit (men)",
            ProfessionalStyle::FemaleSuit => "Business suit (women)",
            ProfessionalStyle::SmartCasual => "Business casual",
            ProfessionalStyle::MinimalWhite => "Simple white background",
            ProfessionalStyle::ModernGray => "Refined gray background",
        }
    }

    /// Prompt text sent to the image model alongside the photo.
    pub const fn instruction(self) -> &'static str {
        match self {
            ProfessionalStyle::MaleSuit => "Transform the person in the photo into a professional studio portrait. Change their outfit to a high-quality dark business suit with a white shirt and tie. Set the background to a clean, professional solid studio gray. Maintain the person's identity and facial structure but enhance the lighting and skin texture for a polished resume look.",
            ProfessionalStyle::FemaleSuit => "Transform the person in the photo into a professional studio portrait. Change their outfit to a sophisticated business suit or professional blouse. Set the background to a clean, professional solid studio light blue. Maintain the person's identity and facial structure but enhance the lighting and skin texture for a polished resume look.",
            ProfessionalStyle::SmartCasual => "Transform the person in the photo into a modern professional portrait. Change their outfit to smart business casual (e.g., a blazer over a knit or a crisp button-down). Set the background to a bright, modern studio setup. Maintain the person's identity and enhance overall photo quality.",
            ProfessionalStyle::MinimalWhite => "Enhance the person's photo for a professional profile. Replace the existing background with a perfectly clean, minimalist solid white studio background. Improve lighting to remove shadows and enhance facial clarity while keeping the original outfit if it's appropriate, or subtlely refining it.",
            ProfessionalStyle::ModernGray => "Create a high-end corporate headshot. Replace the background with a professional textured gray studio backdrop. Adjust lighting to follow standard professional photography patterns (butterfly or Rembrandt lighting). Ensure the person looks sharp and trustworthy.",
        }
    }

    /// Accepts an identifier such as `minimal-white` / `MINIMAL_WHITE`, or a
    /// 1-based catalog position.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if let Ok(index) = trimmed.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|index| Self::ALL.get(index).copied());
        }

        let normalized = trimmed.replace('-', "_").to_uppercase();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == normalized)
    }
}
