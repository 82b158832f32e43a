// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::database::models::Ingredient;
use crate::ops::catalog;
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const BATCH_SIZE: usize = 50;

#[derive(Deserialize, Debug)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Deserialize, Debug)]
pub struct TagRecord {
    pub name: String,
    pub slug: String,
}

pub trait Importer {
    fn done(&self) -> bool;
    fn num_imported(&self) -> usize;
    fn num_skipped(&self) -> usize;
    fn percent_done(&self) -> f32;
    fn import_one(&mut self, conn: &mut database::Connection) -> crate::Result<()>;
}

pub struct IngredientImporter {
    records: Vec<IngredientRecord>,
    num_imported: usize,
    num_skipped: usize,
    total_num_records: usize,
}

impl IngredientImporter {
    pub fn new(path: impl AsRef<Path>) -> crate::Result<Self> {
        let records: Vec<IngredientRecord> =
            serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let total_num_records = records.len();

        Ok(Self {
            records,
            num_imported: 0,
            num_skipped: 0,
            total_num_records,
        })
    }
}

impl Importer for IngredientImporter {
    fn done(&self) -> bool {
        self.records.is_empty()
    }

    fn num_imported(&self) -> usize {
        self.num_imported
    }

    fn num_skipped(&self) -> usize {
        self.num_skipped
    }

    fn percent_done(&self) -> f32 {
        (self.num_imported + self.num_skipped) as f32 / self.total_num_records as f32
    }

    fn import_one(&mut self, conn: &mut database::Connection) -> crate::Result<()> {
        use database::schema::ingredients::dsl::*;

        assert!(!self.done());

        let split_point = self.records.len().saturating_sub(BATCH_SIZE);
        for record in self.records.split_off(split_point) {
            let existing = ingredients
                .select(Ingredient::as_select())
                .filter(name.eq(&record.name))
                .filter(measurement_unit.eq(&record.measurement_unit))
                .get_result(conn)
                .optional()?;
            if existing.is_some() {
                self.num_skipped += 1;
                continue;
            }
            catalog::add_ingredient(conn, &record.name, &record.measurement_unit)?;
            self.num_imported += 1;
        }
        Ok(())
    }
}

pub struct TagImporter {
    records: Vec<TagRecord>,
    num_imported: usize,
    num_skipped: usize,
    total_num_records: usize,
}

impl TagImporter {
    pub fn new(path: impl AsRef<Path>) -> crate::Result<Self> {
        let records: Vec<TagRecord> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let total_num_records = records.len();

        Ok(Self {
            records,
            num_imported: 0,
            num_skipped: 0,
            total_num_records,
        })
    }
}

impl Importer for TagImporter {
    fn done(&self) -> bool {
        self.records.is_empty()
    }

    fn num_imported(&self) -> usize {
        self.num_imported
    }

    fn num_skipped(&self) -> usize {
        self.num_skipped
    }

    fn percent_done(&self) -> f32 {
        (self.num_imported + self.num_skipped) as f32 / self.total_num_records as f32
    }

    fn import_one(&mut self, conn: &mut database::Connection) -> crate::Result<()> {
        use database::schema::tags::dsl::*;

        assert!(!self.done());

        let split_point = self.records.len().saturating_sub(BATCH_SIZE);
        for record in self.records.split_off(split_point) {
            let existing: Option<String> = tags
                .select(slug)
                .filter(slug.eq(&record.slug))
                .get_result(conn)
                .optional()?;
            if existing.is_some() {
                self.num_skipped += 1;
                continue;
            }
            catalog::add_tag(conn, &record.name, &record.slug)?;
            self.num_imported += 1;
        }
        Ok(())
    }
}

fn run_import(conn: &mut database::Connection, importer: &mut impl Importer) -> crate::Result<()> {
    while !importer.done() {
        importer.import_one(conn)?;
        log::debug!("import {:.0}% done", importer.percent_done() * 100.0);
    }
    Ok(())
}

pub fn import_ingredients(
    conn: &mut database::Connection,
    path: impl AsRef<Path>,
) -> crate::Result<()> {
    let mut importer = IngredientImporter::new(path)?;
    run_import(conn, &mut importer)?;
    log::info!(
        "imported {} ingredients, {} already present",
        importer.num_imported(),
        importer.num_skipped()
    );
    Ok(())
}

pub fn import_tags(conn: &mut database::Connection, path: impl AsRef<Path>) -> crate::Result<()> {
    let mut importer = TagImporter::new(path)?;
    run_import(conn, &mut importer)?;
    log::info!(
        "imported {} tags, {} already present",
        importer.num_imported(),
        importer.num_skipped()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing;
    use std::env;
    use std::fs;

    fn write_fixture(file_name: &str, contents: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(file_name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn ingredient_import_is_idempotent() {
        let mut conn = testing::connection();
        let path = write_fixture(
            "foodgram-test-ingredients.json",
            r#"[
                {"name": "flour", "measurement_unit": "g"},
                {"name": "milk", "measurement_unit": "ml"}
            ]"#,
        );

        let mut importer = IngredientImporter::new(&path).unwrap();
        run_import(&mut conn, &mut importer).unwrap();
        assert_eq!(importer.num_imported(), 2);
        assert_eq!(importer.num_skipped(), 0);

        let mut importer = IngredientImporter::new(&path).unwrap();
        run_import(&mut conn, &mut importer).unwrap();
        assert_eq!(importer.num_imported(), 0);
        assert_eq!(importer.num_skipped(), 2);

        let names: Vec<_> = catalog::list_ingredients(&mut conn)
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["flour", "milk"]);
    }

    #[test]
    fn tag_import_skips_existing_slugs() {
        let mut conn = testing::connection();
        testing::tag(&mut conn, "dinner");
        let path = write_fixture(
            "foodgram-test-tags.json",
            r#"[
                {"name": "Dinner", "slug": "dinner"},
                {"name": "Breakfast", "slug": "breakfast"}
            ]"#,
        );

        let mut importer = TagImporter::new(&path).unwrap();
        run_import(&mut conn, &mut importer).unwrap();
        assert_eq!(importer.num_imported(), 1);
        assert_eq!(importer.num_skipped(), 1);
        assert_eq!(catalog::list_tags(&mut conn).unwrap().len(), 2);
    }

    #[test]
    fn malformed_record_fails_the_import() {
        let mut conn = testing::connection();
        let path = write_fixture(
            "foodgram-test-bad-tags.json",
            r#"[{"name": "Dinner", "slug": "Not A Slug"}]"#,
        );

        let mut importer = TagImporter::new(&path).unwrap();
        assert!(run_import(&mut conn, &mut importer).is_err());
    }
}
