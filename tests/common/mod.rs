//! Shared fixtures: a trimmed-down arm64 kernel tree with the six hook targets.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const EXEC_C: &str = "\
// SPDX-License-Identifier: GPL-2.0-only
#include <linux/slab.h>
#include <linux/file.h>
#include <linux/fs.h>

static int do_execveat_common(int fd, struct filename *filename,
\t\t\t      struct user_arg_ptr argv,
\t\t\t      struct user_arg_ptr envp,
\t\t\t      int flags)
{
\tchar *pathbuf = NULL;
\tstruct linux_binprm *bprm;
\tint retval;

\tif (IS_ERR(filename))
\t\treturn PTR_ERR(filename);

\treturn retval;
}
";

pub const OPEN_C: &str = "\
#include <linux/string.h>
#include <linux/mm.h>

/*
 * access() needs to use the real uid/gid, not the effective uid/gid.
 */
SYSCALL_DEFINE3(faccessat, int, dfd, const char __user *, filename, int, mode)
{
\tconst struct cred *old_cred;
\tstruct cred *override_cred;
\tint res;

\tif (mode & ~S_IRWXO)\t/* where's F_OK, X_OK, W_OK, R_OK? */
\t\treturn -EINVAL;

\treturn res;
}
";

pub const READ_WRITE_C: &str = "\
#include <linux/slab.h>
#include <linux/stat.h>

ssize_t __vfs_read(struct file *file, char __user *buf, size_t count,
\t\t   loff_t *pos)
{
\tif (file->f_op->read)
\t\treturn file->f_op->read(file, buf, count, pos);
\treturn -EINVAL;
}

ssize_t vfs_read(struct file *file, char __user *buf, size_t count, loff_t *pos)
{
\tssize_t ret;

\tif (!(file->f_mode & FMODE_READ))
\t\treturn -EBADF;
\treturn ret;
}
";

pub const STAT_C: &str = "\
#include <linux/export.h>
#include <linux/mm.h>

int vfs_statx(int dfd, const char __user *filename, int flags,
\t      struct kstat *stat, u32 request_mask)
{
\tstruct path path;
\tint error = -EINVAL;
\tunsigned int lookup_flags = LOOKUP_FOLLOW | LOOKUP_AUTOMOUNT;

\tif ((flags & ~(AT_SYMLINK_NOFOLLOW | AT_NO_AUTOMOUNT |
\t\t       AT_EMPTY_PATH | KSTAT_QUERY_FLAGS)) != 0)
\t\treturn -EINVAL;
\treturn error;
}
";

pub const INODE_C: &str = "\
#include <linux/module.h>
#include <linux/devpts_fs.h>

void *devpts_get_priv(struct dentry *dentry)
{
\tif (dentry->d_sb->s_magic != DEVPTS_SUPER_MAGIC)
\t\treturn NULL;
\treturn dentry->d_fsdata;
}
";

pub const INPUT_C: &str = "\
#include <linux/init.h>
#include <linux/input/mt.h>

static void input_handle_event(struct input_dev *dev,
\t\t\t       unsigned int type, unsigned int code, int value)
{
\tint disposition = input_get_disposition(dev, type, code, &value);

\tif (disposition != INPUT_IGNORE_EVENT && type != EV_SYN)
\t\tadd_input_randomness(type, code, value);
}
";

pub const DEFCONFIG: &str = "\
CONFIG_LOCALVERSION=\"-avicii\"
CONFIG_MODULES=y
CONFIG_KSU=n
CONFIG_ARM64=y
";

/// (relative path, content) for every target in the built-in registry
pub fn sources() -> Vec<(&'static str, &'static str)> {
    vec![
        ("fs/exec.c", EXEC_C),
        ("fs/open.c", OPEN_C),
        ("fs/read_write.c", READ_WRITE_C),
        ("fs/stat.c", STAT_C),
        ("fs/devpts/inode.c", INODE_C),
        ("drivers/input/input.c", INPUT_C),
    ]
}

pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("fixture path has a parent")).expect("Failed to create dir");
    fs::write(&path, content).expect("Failed to write fixture");
    path
}

/// Populate `root` with all sources and an `avicii_defconfig`
pub fn create_kernel_tree(root: &Path) {
    for (rel, content) in sources() {
        write_file(root, rel, content);
    }
    write_file(root, "arch/arm64/configs/vendor/avicii_defconfig", DEFCONFIG);
}

pub fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).expect("Failed to read fixture")
}
