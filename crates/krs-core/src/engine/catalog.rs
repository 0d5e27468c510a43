//! Catalog writes that carry scheduling invariants.

use std::collections::HashSet;

use uuid::Uuid;

use super::{load_sections, require_term};
use crate::{
  Result,
  catalog::{ClashResource, NewPackage, NewSection, Package, Section},
  conflict::find_clash,
  error::{NotFound, ValidationError},
  unit::UnitOfWork,
};

/// Schedule a new section. Within a term a room or an instructor cannot be
/// booked for two overlapping sections.
pub fn add_section(uow: &mut impl UnitOfWork, input: NewSection) -> Result<Section> {
  input.validate()?;
  require_term(uow, input.term_id)?;
  uow
    .course(input.course_id)?
    .ok_or(NotFound::Course(input.course_id))?;

  let section = Section {
    section_id:    Uuid::new_v4(),
    term_id:       input.term_id,
    course_id:     input.course_id,
    instructor_id: input.instructor_id,
    room:          input.room,
    label:         input.label,
    slot:          input.slot,
    seat_cap:      input.seat_cap,
  };

  let scheduled = uow.sections_in_term(section.term_id)?;
  for resource in [ClashResource::Room, ClashResource::Instructor] {
    if let Some(conflict) = find_clash(&section, &scheduled, resource) {
      return Err(ValidationError::SectionClash { resource, conflict }.into());
    }
  }

  uow.insert_section(&section)?;
  Ok(section)
}

/// Register a package. Its sections must exist, be distinct, and belong to
/// the package's term.
pub fn add_package(uow: &mut impl UnitOfWork, input: NewPackage) -> Result<Package> {
  require_term(uow, input.term_id)?;

  let mut seen = HashSet::new();
  for detail in load_sections(uow, &input.section_ids)? {
    let section = detail.section;
    if section.term_id != input.term_id {
      return Err(
        ValidationError::SectionOutsideTerm {
          section_id: section.section_id,
          expected:   input.term_id,
          actual:     section.term_id,
        }
        .into(),
      );
    }
    if !seen.insert(section.section_id) {
      return Err(
        ValidationError::DuplicateSection { section_id: section.section_id }
          .into(),
      );
    }
  }

  let package = Package {
    package_id:  Uuid::new_v4(),
    name:        input.name,
    program:     input.program,
    cohort:      input.cohort,
    term_id:     input.term_id,
    section_ids: input.section_ids,
  };
  uow.insert_package(&package)?;
  Ok(package)
}
