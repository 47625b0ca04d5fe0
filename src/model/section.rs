/*
 * Copyright (c) 2020. Beautiful Code BV, Rotterdam, Netherlands
 * Licensed under GNU GENERAL PUBLIC LICENSE Version 3.
 */

//! Cross-section catalog for the rolled sections members refer to.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Section {
    pub name: &'static str,
    pub depth: f64,
    pub width: f64,
    pub web_thickness: f64,
    pub flange_thickness: f64,
    /// Radius of gyration about the weak axis
    pub radius_of_gyration: f64,
}

const CATALOG: [Section; 12] = [
    section("IPE200", 200.0, 100.0, 5.6, 8.5, 22.4),
    section("IPE240", 240.0, 120.0, 6.2, 9.8, 26.9),
    section("IPE300", 300.0, 150.0, 7.1, 10.7, 33.5),
    section("IPE400", 400.0, 180.0, 8.6, 13.5, 39.5),
    section("HEA160", 152.0, 160.0, 6.0, 9.0, 39.8),
    section("HEA200", 190.0, 200.0, 6.5, 10.0, 49.8),
    section("HEA300", 290.0, 300.0, 8.5, 14.0, 74.9),
    section("HEB200", 200.0, 200.0, 9.0, 15.0, 50.7),
    section("HEB300", 300.0, 300.0, 11.0, 19.0, 75.8),
    section("SHS100X6", 100.0, 100.0, 6.0, 6.0, 37.9),
    section("SHS150X8", 150.0, 150.0, 8.0, 8.0, 57.3),
    section("CHS168X6", 168.3, 168.3, 6.3, 6.3, 57.4),
];

/// Used when a member names a section the catalog does not know
const ASSUMED: Section = section("ASSUMED", 200.0, 200.0, 8.0, 12.0, 45.0);

const fn section(
    name: &'static str,
    depth: f64,
    width: f64,
    web_thickness: f64,
    flange_thickness: f64,
    radius_of_gyration: f64,
) -> Section {
    Section {
        name,
        depth,
        width,
        web_thickness,
        flange_thickness,
        radius_of_gyration,
    }
}

impl Section {
    /// Lookup ignores case and whitespace, so "HE A 200" finds HEA200
    pub fn lookup(reference: &str) -> Option<Section> {
        let key: String = reference
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        CATALOG.iter().find(|section| section.name == key).copied()
    }

    /// Catalog section, or the assumed section with a flag telling the caller to trust it less
    pub fn resolve(reference: &str) -> (Section, bool) {
        match Self::lookup(reference) {
            Some(section) => (section, true),
            None => (ASSUMED, false),
        }
    }

    pub fn largest_dimension(&self) -> f64 {
        self.depth.max(self.width)
    }
}
