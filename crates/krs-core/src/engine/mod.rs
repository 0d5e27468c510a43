//! Engine operations. Each public function is one atomic unit: the caller
//! runs it inside a single [`UnitOfWork`] and commits only on `Ok`.

pub mod aggregate;
pub mod catalog;
pub mod ledger;
pub mod registration;

use uuid::Uuid;

use crate::{
  Result,
  catalog::{SectionDetail, Student},
  error::NotFound,
  registration::Registration,
  term::Term,
  unit::UnitOfWork,
};

pub use ledger::FinalizeOutcome;

fn require_student(uow: &mut impl UnitOfWork, id: Uuid) -> Result<Student> {
  uow.student(id)?.ok_or_else(|| NotFound::Student(id).into())
}

fn require_term(uow: &mut impl UnitOfWork, id: Uuid) -> Result<Term> {
  uow.term(id)?.ok_or_else(|| NotFound::Term(id).into())
}

fn require_section(uow: &mut impl UnitOfWork, id: Uuid) -> Result<SectionDetail> {
  uow.section(id)?.ok_or_else(|| NotFound::Section(id).into())
}

fn require_registration(
  uow: &mut impl UnitOfWork,
  id: Uuid,
) -> Result<Registration> {
  uow
    .registration(id)?
    .ok_or_else(|| NotFound::Registration(id).into())
}

/// Fetch sections in the given order, failing on the first unknown id.
fn load_sections(
  uow: &mut impl UnitOfWork,
  ids: &[Uuid],
) -> Result<Vec<SectionDetail>> {
  ids.iter().map(|&id| require_section(uow, id)).collect()
}
