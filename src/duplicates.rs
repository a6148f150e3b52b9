use std::collections::{BTreeSet, HashMap};

use crate::domain::Barcode;
use crate::error::KiraError;
use crate::report::ReportEntry;

pub fn find_duplicates(barcodes: &[Barcode]) -> (Vec<Barcode>, Option<ReportEntry>) {
    let mut counts: HashMap<&Barcode, usize> = HashMap::new();
    for barcode in barcodes {
        *counts.entry(barcode).or_default() += 1;
    }

    let dups = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(barcode, _)| barcode.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();

    let entry = (!dups.is_empty()).then(|| {
        let names = dups.iter().map(|bc| bc.as_str().to_string()).collect();
        ReportEntry::from_error(&KiraError::DuplicateBarcodes(names))
    });
    (dups, entry)
}

pub fn unique_in_order(barcodes: &[Barcode]) -> Vec<Barcode> {
    let mut seen = BTreeSet::new();
    barcodes
        .iter()
        .filter(|barcode| seen.insert(*barcode))
        .cloned()
        .collect()
}
