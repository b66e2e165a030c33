//! SQL for the catalog source.
//!
//! Every value is bound as a parameter; table names are fixed per statement.
//! Change feeds page on `(modified, id)`: `$1` is the cursor timestamp, `$2`
//! the cursor id (NULL on the first page) and `$3` the page size.

pub(crate) const CHANGED_WORKS: &str = r#"
    SELECT id, modified
    FROM work
    WHERE modified > $1 OR (modified = $1 AND id > $2::uuid)
    ORDER BY modified, id
    LIMIT $3
"#;

pub(crate) const CHANGED_PEOPLE: &str = r#"
    SELECT id, full_name, modified
    FROM person
    WHERE modified > $1 OR (modified = $1 AND id > $2::uuid)
    ORDER BY modified, id
    LIMIT $3
"#;

pub(crate) const CHANGED_GENRES: &str = r#"
    SELECT id, name, description, modified
    FROM genre
    WHERE modified > $1 OR (modified = $1 AND id > $2::uuid)
    ORDER BY modified, id
    LIMIT $3
"#;

pub(crate) const WORKS_BY_PEOPLE: &str = r#"
    SELECT w.id
    FROM work w
    JOIN person_work pw ON pw.work_id = w.id
    WHERE pw.person_id = ANY($1)
    ORDER BY w.modified
"#;

pub(crate) const WORKS_BY_GENRES: &str = r#"
    SELECT w.id
    FROM work w
    JOIN genre_work gw ON gw.work_id = w.id
    WHERE gw.genre_id = ANY($1)
    ORDER BY w.modified
"#;

pub(crate) const WORK_ROWS: &str = r#"
    SELECT
        w.id,
        w.title,
        w.description,
        w.rating::float8 AS rating,
        pw.role::text AS role,
        p.id AS person_id,
        p.full_name,
        g.name AS genre_name
    FROM work w
    LEFT JOIN person_work pw ON pw.work_id = w.id
    LEFT JOIN person p ON p.id = pw.person_id
    LEFT JOIN genre_work gw ON gw.work_id = w.id
    LEFT JOIN genre g ON g.id = gw.genre_id
    WHERE w.id = ANY($1)
"#;
