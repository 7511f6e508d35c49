use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::Error;
use crate::form::machine::{Effect, Event};
use crate::form::session::FormSession;
use crate::model::{Field, FieldValue, Step};
use crate::validation::Validator;

/// A complete set of answers, as stored in a JSON answers file.
///
/// ```json
/// { "is_student_under_16": false,
///   "fields": { "studentName": "Jane Doe", "termsAndPrivacy": true } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Answers {
    pub is_student_under_16: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Answers {
    /// Walks `session` through every step, filling each step's fields before
    /// moving on. Returns the steps visited in order.
    ///
    /// Stops with `Effect::Submit` pending once the consent step validates.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownField` for names outside the form, or
    /// `Error::Transition` when a step fails validation.
    pub fn replay(
        &self,
        session: &mut FormSession,
        validator: &Validator,
    ) -> Result<Vec<Step>, Error> {
        let mut values = Vec::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            let field: Field = name.parse()?;
            values.push((field, value.clone()));
        }

        session.apply(Event::AnswerAge(self.is_student_under_16), validator)?;
        let mut visited = Vec::new();
        while let Some(def) = session.current_definition() {
            visited.push(def.step);
            for (field, value) in &values {
                if def.fields.contains(field) && *field != Field::IsStudentUnder16 {
                    session.apply(Event::SetField(*field, value.clone()), validator)?;
                }
            }
            if session.apply(Event::Next, validator)? == Effect::Submit {
                break;
            }
        }
        Ok(visited)
    }
}
