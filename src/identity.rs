//! Identity resolver — admission, removal, and listing of people.
//!
//! A person is addressed by the composite key `(full_name, birth_date)`;
//! admission rejects a key that is already taken and any biographical dates
//! that contradict each other or the calendar. Removal takes the person and
//! every edge touching them out in one transaction, so an orphan edge is
//! never observable.

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::model::{person::parse_date, Person, PersonKey, PERSON_LABEL};
use crate::store::{GraphStore, TxMode};
use crate::{Error, Result};

/// Admission and removal of people, over an injected store client.
pub struct IdentityResolver<'g, S: GraphStore> {
    store: &'g S,
}

impl<'g, S: GraphStore> IdentityResolver<'g, S> {
    pub fn new(store: &'g S) -> Self {
        Self { store }
    }

    /// Admit a person.
    ///
    /// Dates arrive as `YYYY-MM-DD` wire strings. Validation happens before
    /// the store is touched; the identity-key uniqueness check happens
    /// inside the store's commit, so two racing admissions of the same key
    /// settle to one success and one `DuplicateIdentity`.
    pub async fn admit(
        &self,
        full_name: &str,
        birth_date: &str,
        death_date: Option<&str>,
        gender: Option<&str>,
    ) -> Result<Person> {
        let key = PersonKey::parse(full_name, birth_date)?;
        let today = today();
        if key.birth_date > today {
            return Err(Error::Validation("birth date cannot be in the future".into()));
        }
        let death_date = death_date.map(|raw| check_death_date(raw, key.birth_date, today)).transpose()?;

        let person = Person { key, death_date, gender: gender.map(str::to_owned) };

        let mut tx = self.store.begin(TxMode::ReadWrite).await?;
        self.store.create_node(&mut tx, PERSON_LABEL, person.to_props()).await?;
        self.store.commit(tx).await.map_err(|e| match e {
            Error::ConstraintViolation(_) => Error::DuplicateIdentity(person.key.to_string()),
            other => other,
        })?;

        debug!(person = %person.key, "person admitted");
        Ok(person)
    }

    /// Remove a person and every relation edge incident to them, atomically.
    pub async fn remove(&self, full_name: &str, birth_date: &str) -> Result<()> {
        let key = PersonKey::parse(full_name, birth_date)?;

        let mut tx = self.store.begin(TxMode::ReadWrite).await?;
        let node = self
            .store
            .find_node(&tx, PERSON_LABEL, &key.match_props())
            .await?
            .ok_or_else(|| Error::NotFound(format!("person {key}")))?;
        self.store.detach_delete_node(&mut tx, node.id).await?;
        self.store.commit(tx).await?;

        debug!(person = %key, "person and incident relations removed");
        Ok(())
    }

    /// Every admitted person, ordered by name then birth date.
    pub async fn list_all(&self) -> Result<Vec<Person>> {
        let tx = self.store.begin(TxMode::ReadOnly).await?;
        let nodes = self.store.nodes_by_label(&tx, PERSON_LABEL).await?;
        self.store.commit(tx).await?;

        let mut people = nodes.iter().map(Person::from_node).collect::<Result<Vec<_>>>()?;
        people.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(people)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn check_death_date(raw: &str, birth: NaiveDate, today: NaiveDate) -> Result<NaiveDate> {
    let death = parse_date("death date", raw)?;
    if death > today {
        return Err(Error::Validation("death date cannot be in the future".into()));
    }
    if death < birth {
        return Err(Error::Validation("death date cannot be earlier than birth date".into()));
    }
    Ok(death)
}
