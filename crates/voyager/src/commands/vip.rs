//! VIP membership and product commands (billing backend).

use voyager_api::billing::ProductQuery;

use crate::cli::{VipArgs, VipCommand};
use crate::commands::Session;
use crate::error::CliError;
use crate::output::{self, millis};

pub async fn handle(session: &Session, args: VipArgs) -> Result<(), CliError> {
    let billing = session.billing()?;

    match args.command {
        VipCommand::Info => {
            let info = billing.vip_info().await?;
            output::render(
                session.output,
                &info,
                &[
                    ("vip", info.is_vip.to_string()),
                    ("level", info.vip_level.to_string()),
                    ("type", info.vip_type.clone()),
                    ("expires", millis(info.expire_date)),
                    ("remaining_days", info.remaining_days.to_string()),
                    ("auto_renew", info.auto_renew.to_string()),
                ],
            )
        }

        VipCommand::Status => {
            let status = billing.vip_status().await?;
            output::render(
                session.output,
                &status,
                &[
                    ("active", status.is_active.to_string()),
                    ("status", status.status.clone()),
                    ("expires", millis(status.expires_at)),
                ],
            )
        }

        VipCommand::Quota => {
            let quota = billing.quota().await?;
            output::render(
                session.output,
                &quota,
                &[
                    ("type", quota.quota_type.clone()),
                    ("used", format!("{}/{}", quota.used_quota, quota.daily_quota)),
                    ("remaining", quota.remaining_quota.to_string()),
                    ("resets", millis(quota.reset_time)),
                ],
            )
        }

        VipCommand::Products {
            platform,
            product_type,
            featured,
        } => {
            let query = ProductQuery {
                platform,
                product_type,
                featured,
            };
            let list = billing.products(query).await?;
            let rows: Vec<(&str, String)> = list
                .products
                .iter()
                .map(|p| {
                    (
                        p.product_id.as_str(),
                        format!("{}  {:.2} {}", p.name, p.price, p.currency),
                    )
                })
                .collect();
            output::render(session.output, &list, &rows)
        }
    }
}
