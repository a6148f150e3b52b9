use crate::domain::TemplateId;

// Templates never fetched and never mapped (the vioscreen FFQ is not
// retrievable through the template endpoint).
pub const TEMPLATES_TO_IGNORE: &[TemplateId] = &[10001];

pub const MISSING_VALUE: &str = "Missing: not provided";
pub const MULTISELECT_UNSELECTED: &str = "false";
pub const MULTISELECT_SELECTED: &str = "true";

pub const HOST_SUBJECT_ID: &str = "HOST_SUBJECT_ID";
pub const COLLECTION_TIMESTAMP: &str = "COLLECTION_TIMESTAMP";
pub const SAMPLE_NAME: &str = "sample_name";

pub const PRIVATE_PREFIX: &str = "pm_";

// Fields that are never shared publicly. Compared case-insensitively.
pub const PRIVATE_FIELDS: &[&str] = &[
    "ABOUT_YOURSELF_TEXT",
    "ANTIBIOTIC_CONDITION",
    "ANTIBIOTIC_MED",
    "BIRTH_MONTH",
    "CAT_CONTACT",
    "CAT_LOCATION",
    "CONDITIONS_MEDICATION",
    "DIET_RESTRICTIONS_LIST",
    "DOG_CONTACT",
    "DOG_LOCATION",
    "GENDER",
    "MEDICATION_LIST",
    "OTHER_CONDITIONS_LIST",
    "PREGNANT_DUE_DATE",
    "RACE_OTHER",
    "RELATIONSHIPS_WITH_OTHERS_IN_STUDY",
    "SPECIAL_RESTRICTIONS",
    "SUPPLEMENTS",
    "TRAVEL_LOCATIONS_LIST",
    "ZIP_CODE",
    "WILLING_TO_BE_CONTACTED",
    "pets_other_freetext",
];

pub fn is_ignored_template(template_id: TemplateId) -> bool {
    TEMPLATES_TO_IGNORE.contains(&template_id)
}

pub fn is_private_column(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered.starts_with(PRIVATE_PREFIX)
        || PRIVATE_FIELDS
            .iter()
            .any(|field| field.to_lowercase() == lowered)
}

const HUMAN_COMMON: &[(&str, &str)] = &[
    ("ENV_BIOME", "urban biome"),
    ("ENV_FEATURE", "human-associated habitat"),
    ("HOST_COMMON_NAME", "human"),
    ("HOST_SCIENTIFIC_NAME", "Homo sapiens"),
    ("HOST_TAXID", "9606"),
];

struct SiteInvariants {
    site: &'static str,
    fields: &'static [(&'static str, &'static str)],
}

const HUMAN_SITES: &[SiteInvariants] = &[
    SiteInvariants {
        site: "Stool",
        fields: &[
            ("SAMPLE_TYPE", "Stool"),
            ("BODY_HABITAT", "UBERON:feces"),
            ("BODY_PRODUCT", "UBERON:feces"),
            ("BODY_SITE", "UBERON:feces"),
            ("DESCRIPTION", "Microsetta Initiative Stool sample"),
            ("ENV_MATERIAL", "feces"),
            ("ENV_PACKAGE", "human-gut"),
            ("SCIENTIFIC_NAME", "human gut metagenome"),
            ("TAXON_ID", "408170"),
        ],
    },
    SiteInvariants {
        site: "Mouth",
        fields: &[
            ("SAMPLE_TYPE", "Mouth"),
            ("BODY_HABITAT", "UBERON:oral cavity"),
            ("BODY_PRODUCT", "UBERON:saliva"),
            ("BODY_SITE", "UBERON:tongue"),
            ("DESCRIPTION", "Microsetta Initiative Mouth sample"),
            ("ENV_MATERIAL", "saliva"),
            ("ENV_PACKAGE", "human-oral"),
            ("SCIENTIFIC_NAME", "human oral metagenome"),
            ("TAXON_ID", "447426"),
        ],
    },
    SiteInvariants {
        site: "Nares",
        fields: &[
            ("SAMPLE_TYPE", "Nares"),
            ("BODY_HABITAT", "UBERON:nose"),
            ("BODY_PRODUCT", "UBERON:mucus"),
            ("BODY_SITE", "UBERON:nostril"),
            ("DESCRIPTION", "Microsetta Initiative Nares sample"),
            ("ENV_MATERIAL", "mucus"),
            ("ENV_PACKAGE", "human-associated"),
            ("SCIENTIFIC_NAME", "human nasopharyngeal metagenome"),
            ("TAXON_ID", "1131769"),
        ],
    },
    SiteInvariants {
        site: "Forehead",
        fields: &[
            ("SAMPLE_TYPE", "skin of head"),
            ("BODY_HABITAT", "UBERON:skin"),
            ("BODY_PRODUCT", "UBERON:sebum"),
            ("BODY_SITE", "UBERON:skin of head"),
            ("DESCRIPTION", "Microsetta Initiative Forehead sample"),
            ("ENV_MATERIAL", "sebum"),
            ("ENV_PACKAGE", "human-skin"),
            ("SCIENTIFIC_NAME", "human skin metagenome"),
            ("TAXON_ID", "539655"),
        ],
    },
    SiteInvariants {
        site: "Left hand",
        fields: &[
            ("SAMPLE_TYPE", "skin of hand"),
            ("BODY_HABITAT", "UBERON:skin"),
            ("BODY_PRODUCT", "UBERON:sebum"),
            ("BODY_SITE", "UBERON:skin of hand"),
            ("DESCRIPTION", "Microsetta Initiative Left hand sample"),
            ("ENV_MATERIAL", "sebum"),
            ("ENV_PACKAGE", "human-skin"),
            ("SCIENTIFIC_NAME", "human skin metagenome"),
            ("TAXON_ID", "539655"),
        ],
    },
    SiteInvariants {
        site: "Right hand",
        fields: &[
            ("SAMPLE_TYPE", "skin of hand"),
            ("BODY_HABITAT", "UBERON:skin"),
            ("BODY_PRODUCT", "UBERON:sebum"),
            ("BODY_SITE", "UBERON:skin of hand"),
            ("DESCRIPTION", "Microsetta Initiative Right hand sample"),
            ("ENV_MATERIAL", "sebum"),
            ("ENV_PACKAGE", "human-skin"),
            ("SCIENTIFIC_NAME", "human skin metagenome"),
            ("TAXON_ID", "539655"),
        ],
    },
    SiteInvariants {
        site: "Vaginal mucus",
        fields: &[
            ("SAMPLE_TYPE", "Vaginal mucus"),
            ("BODY_HABITAT", "UBERON:vagina"),
            ("BODY_PRODUCT", "UBERON:mucus"),
            ("BODY_SITE", "UBERON:vaginal introitus"),
            ("DESCRIPTION", "Microsetta Initiative Vaginal mucus sample"),
            ("ENV_MATERIAL", "mucus"),
            ("ENV_PACKAGE", "human-vaginal"),
            ("SCIENTIFIC_NAME", "human vaginal metagenome"),
            ("TAXON_ID", "1632839"),
        ],
    },
    SiteInvariants {
        site: "Ear wax",
        fields: &[
            ("SAMPLE_TYPE", "Ear wax"),
            ("BODY_HABITAT", "UBERON:ear"),
            ("BODY_PRODUCT", "UBERON:ear wax"),
            ("BODY_SITE", "UBERON:external auditory meatus"),
            ("DESCRIPTION", "Microsetta Initiative Ear wax sample"),
            ("ENV_MATERIAL", "ear wax"),
            ("ENV_PACKAGE", "human-associated"),
            ("SCIENTIFIC_NAME", "human metagenome"),
            ("TAXON_ID", "646099"),
        ],
    },
];

pub fn human_site_invariants(site: &str) -> Option<Vec<(&'static str, &'static str)>> {
    HUMAN_SITES
        .iter()
        .find(|entry| entry.site == site)
        .map(|entry| {
            entry
                .fields
                .iter()
                .chain(HUMAN_COMMON.iter())
                .copied()
                .collect()
        })
}
