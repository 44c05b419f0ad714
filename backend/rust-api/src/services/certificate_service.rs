use chrono::{Datelike, Utc};
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;
use rand::Rng;

use crate::errors::ServiceError;
use crate::metrics::CERTIFICATES_ISSUED_TOTAL;
use crate::models::certificate::{Certificate, VerifiedCertificate};
use crate::models::user::User;

/// Alphabet for the code suffix: 36 symbols, 6 characters, ~2×10^9
/// combinations. Collisions are handled by retrying, not ignored.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_SUFFIX_LEN: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 5;

pub struct CertificateService {
    mongo: Database,
    course_name: String,
}

impl CertificateService {
    pub fn new(mongo: Database, course_name: String) -> Self {
        Self { mongo, course_name }
    }

    fn collection(&self) -> mongodb::Collection<Certificate> {
        self.mongo.collection("certificates")
    }

    /// Issues the user's certificate, or returns the existing one unchanged.
    ///
    /// At-most-once: the unique index on `user_id` decides any concurrent
    /// issuance race; the loser re-reads the winner's document. A
    /// duplicate-key violation on the code index regenerates the code, with
    /// a bounded number of attempts.
    pub async fn issue_or_get(&self, user: &User) -> Result<Certificate, ServiceError> {
        let user_id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("user document has no id"))?;
        if !user.progress.all_completed() {
            return Err(anyhow::anyhow!("certificate requested before course completion").into());
        }

        if let Some(existing) = self.collection().find_one(doc! { "user_id": user_id }).await? {
            return Ok(existing);
        }

        let final_score = user.progress.final_score();

        for _ in 0..MAX_CODE_ATTEMPTS {
            // ThreadRng is scoped so it never lives across an await point.
            let code = {
                let mut rng = rand::rng();
                generate_code(&mut rng, Utc::now().year())
            };
            let certificate = Certificate {
                id: None,
                user_id,
                code,
                issued_at: Utc::now(),
                course: self.course_name.clone(),
                final_score,
            };

            match self.collection().insert_one(&certificate).await {
                Ok(insert_result) => {
                    CERTIFICATES_ISSUED_TOTAL.inc();
                    tracing::info!(
                        "Certificate {} issued for user {} with final score {}",
                        certificate.code,
                        user_id.to_hex(),
                        final_score
                    );
                    let id = insert_result.inserted_id.as_object_id();
                    return Ok(Certificate {
                        id,
                        ..certificate
                    });
                }
                Err(e) => match duplicate_key_message(&e) {
                    // Lost the issuance race: another submission created the
                    // certificate between our check and this insert.
                    Some(message) if message.contains("user_id") => {
                        tracing::debug!(
                            "Concurrent issuance for user {}, returning winner",
                            user_id.to_hex()
                        );
                        return self
                            .collection()
                            .find_one(doc! { "user_id": user_id })
                            .await?
                            .ok_or(ServiceError::NotFound("certificate"));
                    }
                    // Code collision: regenerate and retry.
                    Some(_) => continue,
                    None => return Err(e.into()),
                },
            }
        }

        Err(ServiceError::ResourceExhausted)
    }

    pub async fn find_for_user(
        &self,
        user_id: ObjectId,
    ) -> Result<Option<Certificate>, ServiceError> {
        Ok(self.collection().find_one(doc! { "user_id": user_id }).await?)
    }

    /// Public verification: indexed lookup by code, no authentication.
    pub async fn verify_by_code(&self, code: &str) -> Result<VerifiedCertificate, ServiceError> {
        let certificate = self
            .collection()
            .find_one(doc! { "code": code })
            .await?
            .ok_or(ServiceError::NotFound("certificate"))?;

        let holder = self
            .mongo
            .collection::<User>("users")
            .find_one(doc! { "_id": certificate.user_id })
            .await?
            .ok_or(ServiceError::NotFound("certificate holder"))?;

        Ok(VerifiedCertificate {
            code: certificate.code,
            issued_at: certificate.issued_at,
            course: certificate.course,
            final_score: certificate.final_score,
            holder_name: holder.name,
            holder_id_number: holder.id_number,
        })
    }

    /// Deletes the user's certificate if present. Only the admin progress
    /// reset goes through here.
    pub async fn delete_for_user(&self, user_id: ObjectId) -> Result<(), ServiceError> {
        self.collection()
            .delete_one(doc! { "user_id": user_id })
            .await?;
        Ok(())
    }
}

/// `CERT-{year}-{suffix}` with a 6-character uppercase alphanumeric suffix.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R, year: i32) -> String {
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("CERT-{}-{}", year, suffix)
}

fn duplicate_key_message(err: &mongodb::error::Error) -> Option<&str> {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we)) =
        *err.kind
    {
        if we.code == 11000 {
            return Some(&we.message);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn code_has_expected_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        let code = generate_code(&mut rng, 2026);

        assert!(code.starts_with("CERT-2026-"));
        let suffix = code.strip_prefix("CERT-2026-").unwrap();
        assert_eq!(suffix.len(), CODE_SUFFIX_LEN);
        assert!(suffix
            .bytes()
            .all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn codes_vary_across_draws() {
        let mut rng = StdRng::seed_from_u64(12);
        let codes: HashSet<String> = (0..1000).map(|_| generate_code(&mut rng, 2026)).collect();
        // 1000 draws from a ~2x10^9 keyspace: any collision here would
        // indicate a broken generator, not bad luck.
        assert_eq!(codes.len(), 1000);
    }
}
