use crate::toolchain::Catalog;
use crate::ui;
use anyhow::Result;

pub fn execute(catalog: &Catalog) -> Result<()> {
    for toolchain in catalog.iter() {
        ui::status(&toolchain.name, &toolchain.description);
    }
    ui::info("Install with `devbox install <toolchain>...`");
    Ok(())
}
