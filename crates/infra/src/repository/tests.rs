use super::*;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use adminhub_core::{FieldDef, FieldKind};

use crate::query::{Operator, OrderBy, Pagination};

const NAME: FieldDef = FieldDef::new("name", FieldKind::Text).unique();
const COLOR: FieldDef = FieldDef::new("color", FieldKind::Text);

static GADGET_SCHEMA: EntitySchema = EntitySchema {
    entity: "Gadget",
    table: "gadgets",
    fields: &[ID, NAME, COLOR, CREATED_AT, UPDATED_AT],
};

#[derive(Debug, Clone, PartialEq)]
struct Gadget {
    id: EntityId,
    name: String,
    color: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Gadget {
    fn new(name: &str, color: &str) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            name: name.into(),
            color: color.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl Entity for Gadget {
    fn schema() -> &'static EntitySchema {
        &GADGET_SCHEMA
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with(&ID, self.id)
            .with(&NAME, self.name.as_str())
            .with(&COLOR, self.color.as_str())
            .with(&CREATED_AT, self.created_at)
            .with(&UPDATED_AT, self.updated_at)
    }

    fn from_record(mut record: Record) -> Result<Self, DecodeError> {
        Ok(Self {
            id: record.take_id(&ID)?,
            name: record.take_text(&NAME)?,
            color: record.take_text(&COLOR)?,
            created_at: record.take_timestamp(&CREATED_AT)?,
            updated_at: record.take_timestamp(&UPDATED_AT)?,
        })
    }
}

type Repo = Repository<Gadget, Arc<dyn Storage>>;

fn repo() -> Repo {
    Repository::new(Arc::new(InMemoryStorage::new()) as Arc<dyn Storage>)
}

async fn seed(repo: &Repo, ctx: &Ctx, items: &[(&str, &str)]) -> Vec<Gadget> {
    let mut out = Vec::new();
    for (name, color) in items {
        out.push(repo.create(ctx, &Gadget::new(name, color)).await.unwrap());
    }
    out
}

#[tokio::test]
async fn create_assigns_identity_and_timestamps() {
    let repo = repo();
    let ctx = Ctx::background();
    let before = Utc::now();

    let stored = repo.create(&ctx, &Gadget::new("lamp", "red")).await.unwrap();
    assert!(stored.id.is_assigned());
    assert!(stored.created_at >= before);
    assert_eq!(stored.created_at, stored.updated_at);
}

#[tokio::test]
async fn duplicate_unique_field_is_a_conflict() {
    let repo = repo();
    let ctx = Ctx::background();
    seed(&repo, &ctx, &[("lamp", "red")]).await;

    let err = repo.create(&ctx, &Gadget::new("lamp", "blue")).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict { entity: "Gadget", .. }));
    assert_eq!(
        err.into_domain("Error creating gadget"),
        DomainError::Conflict("Gadget already exists".into())
    );
}

#[tokio::test]
async fn view_requires_exactly_one_match() {
    let repo = repo();
    let ctx = Ctx::background();
    let items = seed(&repo, &ctx, &[("lamp", "red"), ("desk", "red")]).await;

    let by_id = repo.view(&ctx, items[1].id).await.unwrap();
    assert_eq!(by_id.name, "desk");

    let ambiguous = repo.view(&ctx, Filter::new().eq(&COLOR, "red")).await;
    assert_eq!(ambiguous, Err(RepoError::NotFound { entity: "Gadget" }));

    let missing = repo.view(&ctx, EntityId::new(99)).await;
    assert_eq!(missing, Err(RepoError::NotFound { entity: "Gadget" }));
}

#[tokio::test]
async fn list_counts_all_matches_beyond_the_page() {
    let repo = repo();
    let ctx = Ctx::background();
    seed(
        &repo,
        &ctx,
        &[("a", "red"), ("b", "blue"), ("c", "red"), ("d", "red")],
    )
    .await;

    let query = ListQuery::new()
        .with_filter(Filter::new().eq(&COLOR, "red"))
        .order_by(OrderBy::desc(&NAME))
        .paginate(Pagination::new(Some(2), Some(0)));
    let page = repo.list(&ctx, &query).await.unwrap();

    assert_eq!(page.total_count, 3);
    let names: Vec<_> = page.records.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["d", "c"]);
}

#[tokio::test]
async fn list_is_stable_by_id_by_default() {
    let repo = repo();
    let ctx = Ctx::background();
    let items = seed(&repo, &ctx, &[("c", "x"), ("a", "x"), ("b", "x")]).await;

    let page = repo
        .list(&ctx, &ListQuery::new().paginate(Pagination::new(Some(2), Some(1))))
        .await
        .unwrap();
    let ids: Vec<_> = page.records.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![items[1].id, items[2].id]);
}

#[tokio::test]
async fn update_writes_only_changed_fields() {
    let repo = repo();
    let ctx = Ctx::background();
    let lamp = seed(&repo, &ctx, &[("lamp", "red")]).await.remove(0);

    repo.update(&ctx, lamp.id, Changeset::new().set(&COLOR, "green"))
        .await
        .unwrap();

    let after = repo.view(&ctx, lamp.id).await.unwrap();
    assert_eq!(after.name, "lamp");
    assert_eq!(after.color, "green");
    assert_eq!(after.created_at, lamp.created_at);
    assert!(after.updated_at >= lamp.updated_at);
}

#[tokio::test]
async fn empty_changeset_performs_no_write() {
    let repo = repo();
    let ctx = Ctx::background();
    let lamp = seed(&repo, &ctx, &[("lamp", "red")]).await.remove(0);

    repo.update(&ctx, lamp.id, Changeset::new()).await.unwrap();
    assert_eq!(repo.view(&ctx, lamp.id).await.unwrap(), lamp);
}

#[tokio::test]
async fn update_and_delete_of_missing_row_are_not_found() {
    let repo = repo();
    let ctx = Ctx::background();
    let missing = EntityId::new(42);

    assert_eq!(
        repo.update(&ctx, missing, Changeset::new().set(&COLOR, "x")).await,
        Err(RepoError::NotFound { entity: "Gadget" })
    );
    assert_eq!(
        repo.delete(&ctx, missing).await,
        Err(RepoError::NotFound { entity: "Gadget" })
    );
}

#[tokio::test]
async fn update_rejects_read_only_fields() {
    let repo = repo();
    let ctx = Ctx::background();
    let lamp = seed(&repo, &ctx, &[("lamp", "red")]).await.remove(0);

    let err = repo
        .update(&ctx, lamp.id, Changeset::new().set(&CREATED_AT, Utc::now()))
        .await
        .unwrap_err();
    assert_eq!(err, RepoError::Invalid(QueryError::ReadOnlyField("created_at".into())));
}

#[tokio::test]
async fn exist_supports_exclusion_filters() {
    let repo = repo();
    let ctx = Ctx::background();
    let items = seed(&repo, &ctx, &[("lamp", "red"), ("desk", "blue")]).await;

    // The record's own name does not count against it.
    let own = Filter::new().eq(&NAME, "lamp").not_exact(&ID, items[0].id);
    assert!(!repo.exist(&ctx, own).await.unwrap());

    let other = Filter::new().eq(&NAME, "lamp").not_exact(&ID, items[1].id);
    assert!(repo.exist(&ctx, other).await.unwrap());

    let partial = Filter::new().push(&NAME, Operator::Contains, "es");
    assert!(repo.exist(&ctx, partial).await.unwrap());
}

#[tokio::test]
async fn delete_removes_the_row() {
    let repo = repo();
    let ctx = Ctx::background();
    let lamp = seed(&repo, &ctx, &[("lamp", "red")]).await.remove(0);

    repo.delete(&ctx, lamp.id).await.unwrap();
    assert!(!repo.exist(&ctx, lamp.id).await.unwrap());
}

#[tokio::test]
async fn foreign_field_in_filter_is_rejected() {
    const OTHER: FieldDef = FieldDef::new("weight", FieldKind::Int);
    let repo = repo();
    let ctx = Ctx::background();

    let err = repo.exist(&ctx, Filter::new().eq(&OTHER, 1i64)).await.unwrap_err();
    assert_eq!(err, RepoError::Invalid(QueryError::UnknownField("weight".into())));
}

#[tokio::test]
async fn cancelled_context_stops_before_storage() {
    let repo = repo();
    let ctx = Ctx::background();
    ctx.cancel();

    let err = repo.create(&ctx, &Gadget::new("lamp", "red")).await.unwrap_err();
    assert_eq!(err, RepoError::Cancelled);
    assert_eq!(err.into_domain("Error creating gadget"), DomainError::Cancelled);

    let fresh = Ctx::background();
    assert!(!repo.exist(&fresh, Filter::new().eq(&NAME, "lamp")).await.unwrap());
}

#[tokio::test]
async fn failing_count_is_an_error_not_absence() {
    let storage = Arc::new(FaultyStorage::new(InMemoryStorage::new()));
    let repo: Repository<Gadget, _> = Repository::new(Arc::clone(&storage));
    let ctx = Ctx::background();
    storage.fail(StorageOp::Count);

    let err = repo.exist(&ctx, Filter::new().eq(&NAME, "lamp")).await.unwrap_err();
    assert!(matches!(err, RepoError::Storage(StorageError::Backend(_))));
    assert!(matches!(
        err.into_domain("Error checking gadget"),
        DomainError::Internal { .. }
    ));

    storage.heal(StorageOp::Count);
    assert!(!repo.exist(&ctx, Filter::new().eq(&NAME, "lamp")).await.unwrap());
}
